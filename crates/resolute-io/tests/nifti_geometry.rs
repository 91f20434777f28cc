use anyhow::Result;
use burn_ndarray::NdArray;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};
use resolute_io::{read_nifti, write_histogram_nifti, write_nifti};
use std::io::Read;
use tempfile::tempdir;

type TestBackend = NdArray<f32>;

#[test]
fn test_compressed_volume_keeps_geometry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("subjectWarped.nii.gz");
    let device = Default::default();

    let metadata = ImageMetadata::new(
        Point::new([-95.0, -110.0, 42.0]),
        Spacing::new([1.0, 1.25, 2.5]),
        Direction::identity(),
    );
    let samples: Vec<f32> = (0..2 * 3 * 4).map(|v| v as f32 * 0.5).collect();
    let image = Image::<TestBackend, 3>::from_samples(samples.clone(), [2, 3, 4], &metadata, &device)?;

    write_nifti(&path, &image)?;

    let mut magic = [0u8; 2];
    std::fs::File::open(&path)?.read_exact(&mut magic)?;
    assert_eq!(magic, [0x1f, 0x8b], "expected gzip stream");

    let loaded = read_nifti::<TestBackend, _>(&path, &device)?;
    assert_eq!(loaded.shape(), [2, 3, 4]);
    assert!(loaded.has_same_geometry(&image));
    assert_eq!(loaded.samples()?, samples);
    Ok(())
}

#[test]
fn test_histogram_image_layout() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("histo.nii.gz");
    let device = Default::default();

    let metadata = ImageMetadata::new(Point::new([10.0, 3.0]), Spacing::uniform(1.0), Direction::identity());
    // 3 bins on channel A, 2 on channel B
    let counts = vec![1.0, 0.0, 4.0, 2.0, 0.0, 7.0];
    let histogram = Image::<TestBackend, 2>::from_samples(counts, [3, 2], &metadata, &device)?;

    write_histogram_nifti(&path, &histogram)?;

    let obj = ReaderOptions::new().read_file(&path)?;
    assert_eq!(obj.header().sform_code, 2);
    let array = obj.into_volume().into_ndarray::<f32>()?;
    assert_eq!(array.shape(), &[3, 2]);
    assert_eq!(array[[1, 0]], 4.0);
    assert_eq!(array[[2, 1]], 7.0);
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let device = Default::default();
    let result = read_nifti::<TestBackend, _>("/non/existent/volume.nii.gz", &device);
    assert!(result.is_err());
}
