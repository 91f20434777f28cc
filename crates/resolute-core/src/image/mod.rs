//! Image volumes and their geometry.

pub mod image;
pub mod metadata;

pub use image::{Image, MaskImage};
pub use metadata::ImageMetadata;
