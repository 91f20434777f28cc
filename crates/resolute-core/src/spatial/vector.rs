//! Per-axis quantities in physical space.

use nalgebra::SVector;

/// A vector in D-dimensional space.
///
/// Thin wrapper over nalgebra's `SVector`; backs [`Spacing`](super::Spacing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Largest per-component difference to `other`.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        (self.0 - other.0).amax()
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_difference() {
        let a = Vector::new([1.0, 2.0, 3.0]);
        let b = Vector::new([1.0, 2.5, 1.0]);
        assert!((a.max_abs_difference(&b) - 2.0).abs() < 1e-12);
        assert_eq!(Vector::<3>::zeros()[2], 0.0);
    }
}
