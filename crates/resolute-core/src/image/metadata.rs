//! Image geometry: how voxel indices map to physical coordinates.

use crate::spatial::{Direction, Point, Spacing};

/// Default tolerance used when comparing geometries read from different files.
pub const GEOMETRY_TOLERANCE: f64 = 1e-4;

/// Physical-space description of a volume, without its samples.
///
/// Stages that allocate an output "like" an input copy this record, which is
/// how geometry propagates down the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata<const D: usize> {
    /// Physical coordinate of the first voxel (index 0, 0, ...).
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
}

impl<const D: usize> ImageMetadata<D> {
    /// Create new image metadata.
    pub fn new(origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            origin,
            spacing,
            direction,
        }
    }

    /// Get the origin.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// True when origin, spacing and direction agree within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.origin.max_abs_difference(&other.origin) <= tolerance
            && self.spacing.max_abs_difference(&other.spacing) <= tolerance
            && self.direction.max_abs_difference(&other.direction) <= tolerance
    }
}

impl<const D: usize> Default for ImageMetadata<D> {
    fn default() -> Self {
        Self {
            origin: Point::origin(),
            spacing: Spacing::uniform(1.0),
            direction: Direction::identity(),
        }
    }
}
