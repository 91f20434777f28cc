//! Point type for physical coordinates (image origins, voxel centres).

use nalgebra::Point as NaPoint;

/// A point in D-dimensional physical space, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Largest per-axis distance to `other`.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        (0..D)
            .map(|i| (self[i] - other[i]).abs())
            .fold(0.0, f64::max)
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

#[cfg(test)]
mod tests {
    use crate::spatial::Point3;

    #[test]
    fn test_point_creation() {
        let p = Point3::new([1.0, 2.0, 3.0]);
        assert_eq!(p[0], 1.0);
        assert_eq!(p[2], 3.0);
        assert_eq!(Point3::origin()[1], 0.0);
    }

    #[test]
    fn test_point_difference() {
        let p1 = Point3::new([5.0, 5.0, 5.0]);
        let p2 = Point3::new([2.0, 3.0, 4.5]);
        assert!((p1.max_abs_difference(&p2) - 3.0).abs() < 1e-12);
    }
}
