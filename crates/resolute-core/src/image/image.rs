//! Image volume with physical metadata.
//!
//! An [`Image`] pairs a dense tensor of samples with the geometry that places
//! it in patient space. Once a stage publishes an image, downstream stages hold
//! it behind an `Arc` and only read it.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::metadata::{ImageMetadata, GEOMETRY_TOLERANCE};
use crate::error::{ResoluteError, Result};
use crate::spatial::{Direction, Point, Spacing};

/// Medical image with physical metadata.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `D` - The dimensionality of the image (2 for histograms, 3 for volumes)
///
/// Tensor axes are stored slowest-first, i.e. `[Z, Y, X]` for volumes, while
/// origin and spacing are expressed in physical `x, y, z` order.
///
/// # Examples
/// ```rust
/// use resolute_core::Image;
/// use resolute_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([4, 5, 6], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity());
/// assert_eq!(image.shape(), [4, 5, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// The voxel samples, potentially on GPU.
    data: Tensor<B, D>,
    /// Physical coordinate of the first voxel (index 0,0,0).
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
}

/// Label volume marking voxels eligible for sampling; non-zero means "inside".
pub type MaskImage<B> = Image<B, 3>;

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image with the given data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Create an image from a tensor and a geometry record.
    pub fn with_metadata(data: Tensor<B, D>, metadata: &ImageMetadata<D>) -> Self {
        Self::new(
            data,
            *metadata.origin(),
            *metadata.spacing(),
            *metadata.direction(),
        )
    }

    /// Build an image from flat samples laid out in tensor (row-major) order.
    pub fn from_samples(
        samples: Vec<f32>,
        shape: [usize; D],
        metadata: &ImageMetadata<D>,
        device: &B::Device,
    ) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if samples.len() != expected {
            return Err(ResoluteError::computation(format!(
                "sample count {} does not fill shape {:?} ({} voxels)",
                samples.len(),
                shape,
                expected
            )));
        }
        let data = Tensor::<B, D>::from_data(TensorData::new(samples, shape), device);
        Ok(Self::with_metadata(data, metadata))
    }

    /// Allocate a zero-filled image of the given shape and geometry.
    pub fn zeros(shape: [usize; D], metadata: &ImageMetadata<D>, device: &B::Device) -> Self {
        Self::with_metadata(Tensor::<B, D>::zeros(shape, device), metadata)
    }

    /// Allocate a zero-filled image sharing this image's shape and geometry.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape(), &self.metadata(), &self.data.device())
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Get the origin (physical coordinate of first voxel).
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing (physical distance between voxels).
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Geometry of this image, detached from its samples.
    pub fn metadata(&self) -> ImageMetadata<D> {
        ImageMetadata::new(self.origin, self.spacing, self.direction)
    }

    /// Get the image shape as an array.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Copy the samples to the host in row-major order.
    pub fn samples(&self) -> Result<Vec<f32>> {
        self.data
            .to_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .map_err(|e| ResoluteError::computation(format!("failed to read voxel data: {:?}", e)))
    }

    /// True when both images have the same shape and agree on origin, spacing
    /// and direction within [`GEOMETRY_TOLERANCE`].
    pub fn has_same_geometry(&self, other: &Image<B, D>) -> bool {
        self.shape() == other.shape()
            && self.metadata().approx_eq(&other.metadata(), GEOMETRY_TOLERANCE)
    }
}
