//! Spatial types describing where a volume sits in patient space.
//!
//! All types wrap nalgebra so geometry arithmetic stays on the CPU, independent
//! of the tensor backend that holds the voxel samples.

pub mod point;
pub mod vector;
pub mod spacing;
pub mod direction;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
pub use direction::Direction;

pub type Point3 = Point<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
