//! NIfTI reading and writing.
//!
//! In memory, volumes live in the LPS patient frame used by DICOM and by the
//! registration engine; NIfTI affines are RAS, so the first two affine rows are
//! negated on the way in and out. Tensor axes are `[Z, Y, X]`.

use anyhow::{anyhow, bail, Context, Result};
use burn::tensor::backend::Backend;
use nalgebra::{Matrix3, Vector3 as NaVector3};
use ndarray::{Array2, Array3, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};
use std::path::Path;

/// Top three rows of a voxel-to-world affine.
type Affine = [[f64; 4]; 3];

/// sform code for "aligned to another file / anatomical truth".
const SFORM_ALIGNED: i16 = 2;

/// Read a 3-D NIfTI volume (`.nii` or `.nii.gz`).
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .context("Failed to read NIfTI file")?;
    let metadata = geometry_from_affine(&header_affine(obj.header()));

    let volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    if volume.ndim() != 3 {
        bail!("Expected 3D NIfTI file, found {} dimensions", volume.ndim());
    }
    let volume = volume
        .into_dimensionality::<Ix3>()
        .context("Failed to view volume as 3D")?;
    let (nx, ny, nz) = volume.dim();

    // Logical iteration of the [Z, Y, X] view yields X fastest, whatever the
    // memory layout chosen by the reader.
    let samples: Vec<f32> = volume.permuted_axes([2, 1, 0]).iter().copied().collect();
    let image = Image::from_samples(samples, [nz, ny, nx], &metadata, device)?;
    Ok(image)
}

/// Write a 3-D volume with an sform describing its geometry.
///
/// A `.gz` suffix selects gzip compression.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    let [nz, ny, nx] = image.shape();
    let samples = image.samples()?;
    let zyx = Array3::from_shape_vec((nz, ny, nx), samples)
        .map_err(|e| anyhow!("Failed to create ndarray: {}", e))?;
    let xyz = zyx.permuted_axes([2, 1, 0]).as_standard_layout().into_owned();

    let header = volume_header(&image.metadata());
    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&xyz)
        .map_err(|e| anyhow!("Failed to write NIfTI file: {}", e))?;

    Ok(())
}

/// Write a 2-D image (e.g. a joint histogram) as NIfTI.
///
/// Axis 0 of the tensor becomes the NIfTI `i` axis; origin and spacing are
/// stored unchanged, with no patient-frame conversion.
pub fn write_histogram_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 2>) -> Result<()> {
    let [rows, cols] = image.shape();
    let samples = image.samples()?;
    let array = Array2::from_shape_vec((rows, cols), samples)
        .map_err(|e| anyhow!("Failed to create ndarray: {}", e))?;

    let origin = image.origin();
    let spacing = image.spacing();
    let mut header = NiftiHeader::default();
    header.pixdim = [1.0, spacing[0] as f32, spacing[1] as f32, 1.0, 1.0, 1.0, 1.0, 1.0];
    header.srow_x = [spacing[0] as f32, 0.0, 0.0, origin[0] as f32];
    header.srow_y = [0.0, spacing[1] as f32, 0.0, origin[1] as f32];
    header.srow_z = [0.0, 0.0, 1.0, 0.0];
    header.sform_code = SFORM_ALIGNED;
    header.qform_code = 0;

    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&array)
        .map_err(|e| anyhow!("Failed to write histogram image: {}", e))?;

    Ok(())
}

/// Voxel-to-RAS affine from the header: sform, then qform, then pixdim only.
fn header_affine(header: &NiftiHeader) -> Affine {
    let widen = |row: [f32; 4]| row.map(f64::from);

    if header.sform_code > 0 {
        return [widen(header.srow_x), widen(header.srow_y), widen(header.srow_z)];
    }

    let dx = f64::from(header.pixdim[1]);
    let dy = f64::from(header.pixdim[2]);
    let dz = f64::from(header.pixdim[3]);

    if header.qform_code > 0 {
        let b = f64::from(header.quatern_b);
        let c = f64::from(header.quatern_c);
        let d = f64::from(header.quatern_d);
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let dz = dz * qfac;

        return [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                f64::from(header.quatern_x),
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                f64::from(header.quatern_y),
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                f64::from(header.quatern_z),
            ],
        ];
    }

    [
        [dx, 0.0, 0.0, 0.0],
        [0.0, dy, 0.0, 0.0],
        [0.0, 0.0, dz, 0.0],
    ]
}

/// Split a RAS affine into LPS origin, spacing and direction cosines.
fn geometry_from_affine(affine: &Affine) -> ImageMetadata<3> {
    let mut lps = *affine;
    for row in lps.iter_mut().take(2) {
        for value in row.iter_mut() {
            *value = -*value;
        }
    }

    let origin = Point::new([lps[0][3], lps[1][3], lps[2][3]]);
    let axes = [NaVector3::x(), NaVector3::y(), NaVector3::z()];
    let mut spacing = [1.0; 3];
    let mut columns = axes;
    for axis in 0..3 {
        let column = NaVector3::new(lps[0][axis], lps[1][axis], lps[2][axis]);
        let length = column.norm();
        if length > 1e-9 {
            spacing[axis] = length;
            columns[axis] = column / length;
        }
    }

    ImageMetadata::new(
        origin,
        Spacing::new(spacing),
        Direction(Matrix3::from_columns(&columns)),
    )
}

/// Header carrying an sform (RAS) equivalent to the given LPS geometry.
fn volume_header(metadata: &ImageMetadata<3>) -> NiftiHeader {
    let origin = metadata.origin();
    let spacing = metadata.spacing();
    let direction = metadata.direction();

    let srow = |row: usize| -> [f32; 4] {
        let sign = if row < 2 { -1.0 } else { 1.0 };
        [
            (sign * direction[(row, 0)] * spacing[0]) as f32,
            (sign * direction[(row, 1)] * spacing[1]) as f32,
            (sign * direction[(row, 2)] * spacing[2]) as f32,
            (sign * origin[row]) as f32,
        ]
    };

    let mut header = NiftiHeader::default();
    header.pixdim = [
        1.0,
        spacing[0] as f32,
        spacing[1] as f32,
        spacing[2] as f32,
        1.0,
        1.0,
        1.0,
        1.0,
    ];
    header.srow_x = srow(0);
    header.srow_y = srow(1);
    header.srow_z = srow(2);
    header.sform_code = SFORM_ALIGNED;
    header.qform_code = 0;
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use nifti::writer::WriterOptions;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_read_nifti_axis_order() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("ute.nii");

        // X=3, Y=4, Z=5, value encodes (x, y, z)
        let array = Array3::from_shape_fn((3, 4, 5), |(x, y, z)| (x + 10 * y + 100 * z) as f32);
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let image = read_nifti::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(image.shape(), [5, 4, 3]);

        let samples = image.samples()?;
        // [z, y, x] = [1, 2, 0] -> flat index 1*12 + 2*3 + 0
        assert_eq!(samples[12 + 6], 120.0);
        // Last voxel is x=2, y=3, z=4
        assert_eq!(samples[59], 432.0);

        Ok(())
    }

    #[test]
    fn test_pixdim_fallback_geometry() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 0;
        header.pixdim = [1.0, 0.5, 0.75, 2.0, 1.0, 1.0, 1.0, 1.0];

        let metadata = geometry_from_affine(&header_affine(&header));
        assert!((metadata.spacing()[0] - 0.5).abs() < 1e-9);
        assert!((metadata.spacing()[1] - 0.75).abs() < 1e-9);
        assert!((metadata.spacing()[2] - 2.0).abs() < 1e-9);
        // RAS identity is LPS diag(-1, -1, 1)
        assert!((metadata.direction()[(0, 0)] + 1.0).abs() < 1e-9);
        assert!((metadata.direction()[(1, 1)] + 1.0).abs() < 1e-9);
        assert!((metadata.direction()[(2, 2)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_header_inverts_geometry() {
        let metadata = ImageMetadata::new(
            Point::new([-120.0, 84.5, 30.0]),
            Spacing::new([1.5625, 1.5625, 1.6]),
            Direction::identity(),
        );
        let header = volume_header(&metadata);
        let recovered = geometry_from_affine(&header_affine(&header));
        assert!(recovered.approx_eq(&metadata, 1e-4));
    }
}
