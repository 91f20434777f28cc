pub mod error;
pub mod filter;
pub mod image;
pub mod spatial;

pub use error::{ResoluteError, Result};
pub use filter::{PipelineStage, StageState};
pub use image::{Image, ImageMetadata, MaskImage};
pub use spatial::{Direction, Point, Spacing, Vector};
