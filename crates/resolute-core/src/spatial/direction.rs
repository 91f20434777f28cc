//! Direction cosine matrix describing the orientation of the image axes.

use nalgebra::SMatrix;

/// Direction matrix; column `i` is the physical direction of image axis `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Largest element-wise difference to `other`.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        (self.0 - other.0).amax()
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Direction3;

    #[test]
    fn test_direction_identity() {
        let d = Direction3::identity();
        assert_eq!(d[(0, 0)], 1.0);
        assert_eq!(d[(1, 1)], 1.0);
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn test_direction_difference() {
        // 90 degrees around Z
        let rot = Direction(SMatrix::<f64, 3, 3>::new(
            0.0, -1.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
        ));
        assert_eq!(rot[(1, 0)], 1.0);
        assert_eq!(rot[(0, 1)], -1.0);
        assert!((rot.max_abs_difference(&Direction3::identity()) - 1.0).abs() < 1e-12);
        assert_eq!(rot.max_abs_difference(&rot), 0.0);
    }
}
