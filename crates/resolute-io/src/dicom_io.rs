//! DICOM extraction for UTE/MRAC acquisitions.
//!
//! A scanner session directory holds (at least) the MR-derived attenuation
//! map and a dual-echo UTE acquisition. This module groups files into series,
//! identifies the three series the pipeline needs, and loads each one into a
//! volume with LPS geometry.

use anyhow::{anyhow, bail, Context, Result};
use burn::tensor::backend::Backend;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, FileDicomObject, InMemDicomObject};
use dicom::pixeldata::PixelDecoder;
use nalgebra::{Matrix3, Point3 as NaPoint3, Vector3 as NaVector3};
use rayon::prelude::*;
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Metadata for a discovered DICOM series.
#[derive(Debug, Clone)]
pub struct DicomSeriesInfo {
    pub series_instance_uid: String,
    pub series_description: String,
    pub modality: String,
    pub patient_id: String,
    /// Echo time in ms, when the series carries one.
    pub echo_time: Option<f64>,
    pub echo_number: Option<u32>,
    pub file_paths: Vec<PathBuf>,
}

/// The three series a RESOLUTE run consumes.
#[derive(Debug, Clone)]
pub struct UteSeries {
    pub mrac: DicomSeriesInfo,
    /// Shorter echo.
    pub ute_echo1: DicomSeriesInfo,
    /// Longer echo.
    pub ute_echo2: DicomSeriesInfo,
}

/// Scan a directory tree for DICOM series, grouping them by SeriesInstanceUID.
///
/// Headers are parsed in parallel; files that are not DICOM are skipped.
pub fn scan_dicom_directory<P: AsRef<Path>>(path: P) -> Result<Vec<DicomSeriesInfo>> {
    let path = path.as_ref();
    if !path.is_dir() {
        bail!("DICOM input is not a directory");
    }

    let entries: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let series_map = Arc::new(Mutex::new(HashMap::<String, DicomSeriesInfo>::new()));

    entries.par_iter().for_each(|file_path| {
        let Ok(obj) = open_file(file_path) else {
            return;
        };
        let Some(uid) = get_string(&obj, tags::SERIES_INSTANCE_UID) else {
            return;
        };

        let description = get_string(&obj, tags::SERIES_DESCRIPTION).unwrap_or_default();
        let modality = get_string(&obj, tags::MODALITY).unwrap_or_default();
        let patient_id = get_string(&obj, tags::PATIENT_ID).unwrap_or_default();
        let echo_time = get_f64(&obj, tags::ECHO_TIME);
        let echo_number = get_u32(&obj, tags::ECHO_NUMBERS);

        if let Ok(mut map) = series_map.lock() {
            let entry = map.entry(uid.clone()).or_insert_with(|| DicomSeriesInfo {
                series_instance_uid: uid,
                series_description: description,
                modality,
                patient_id,
                echo_time,
                echo_number,
                file_paths: Vec::new(),
            });
            entry.file_paths.push(file_path.clone());
        }
    });

    let map = Arc::try_unwrap(series_map)
        .map_err(|_| anyhow!("Series map still shared after scan"))?
        .into_inner()
        .map_err(|_| anyhow!("Series map lock poisoned"))?;
    let mut series_list: Vec<DicomSeriesInfo> = map.into_values().collect();

    for series in &mut series_list {
        series.file_paths.sort();
    }
    series_list.sort_by(|a, b| a.series_instance_uid.cmp(&b.series_instance_uid));

    info!("Found {} DICOM series", series_list.len());
    Ok(series_list)
}

/// Pick the MRAC series and the two UTE echoes out of a scanned session.
///
/// MRAC is recognised by a description containing `MRAC`, UTE echoes by a
/// description containing `UTE`. Echoes are ordered by echo time when every
/// candidate carries one, otherwise by EchoNumbers.
pub fn identify_ute_series(series: &[DicomSeriesInfo]) -> Result<UteSeries> {
    let describes = |info: &DicomSeriesInfo, key: &str| info.series_description.to_uppercase().contains(key);

    let mrac = series
        .iter()
        .find(|s| describes(s, "MRAC"))
        .cloned()
        .context("No MRAC series found")?;

    let mut echoes: Vec<DicomSeriesInfo> = series
        .iter()
        .filter(|s| describes(s, "UTE") && !describes(s, "MRAC"))
        .cloned()
        .collect();

    if echoes.len() < 2 {
        bail!("Expected two UTE echo series, found {}", echoes.len());
    }

    // Echo times and echo numbers are different units; never mix them in one ordering.
    if echoes.iter().all(|s| s.echo_time.is_some()) {
        echoes.sort_by(|a, b| {
            a.echo_time
                .partial_cmp(&b.echo_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    } else {
        echoes.sort_by_key(|s| s.echo_number.unwrap_or(u32::MAX));
    }

    for echo in &echoes {
        debug!(
            "UTE candidate '{}' TE={:?} echo={:?}",
            echo.series_description, echo.echo_time, echo.echo_number
        );
    }

    let mut echoes = echoes.into_iter();
    let ute_echo1 = echoes.next().context("Missing first UTE echo")?;
    let ute_echo2 = echoes.next().context("Missing second UTE echo")?;

    info!("MRAC series: {}", mrac.series_description);
    info!("UTE echo 1: {}", ute_echo1.series_description);
    info!("UTE echo 2: {}", ute_echo2.series_description);

    Ok(UteSeries {
        mrac,
        ute_echo1,
        ute_echo2,
    })
}

/// Load a DICOM series into a 3-D volume.
///
/// Slices are sorted along the slice normal; orientation must be constant and
/// slice spacing uniform within 1%.
pub fn load_dicom_series<B: Backend>(series: &DicomSeriesInfo, device: &B::Device) -> Result<Image<B, 3>> {
    if series.file_paths.is_empty() {
        bail!("Series {} has no files", series.series_instance_uid);
    }

    let mut slices: Vec<FileDicomObject<InMemDicomObject>> = series
        .file_paths
        .par_iter()
        .map(|p| open_file(p).map_err(|_| anyhow!("Failed to open DICOM file in series {}", series.series_instance_uid)))
        .collect::<Result<Vec<_>>>()?;

    let orientation = get_f64_vec(&slices[0], tags::IMAGE_ORIENTATION_PATIENT)
        .context("Missing ImageOrientationPatient in first slice")?;
    if orientation.len() != 6 {
        bail!("Invalid ImageOrientationPatient length: {}", orientation.len());
    }

    let dir_x = NaVector3::new(orientation[0], orientation[1], orientation[2]).normalize();
    let dir_y = NaVector3::new(orientation[3], orientation[4], orientation[5]).normalize();
    let dir_z = dir_x.cross(&dir_y).normalize();

    let slice_distance = |obj: &FileDicomObject<InMemDicomObject>| {
        get_position(obj).unwrap_or_else(NaPoint3::origin).coords.dot(&dir_z)
    };
    slices.sort_by(|a, b| {
        slice_distance(a)
            .partial_cmp(&slice_distance(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let first = &slices[0];
    let rows = get_u32(first, tags::ROWS).context("Missing Rows")? as usize;
    let cols = get_u32(first, tags::COLUMNS).context("Missing Columns")? as usize;
    let pixel_spacing = get_f64_vec(first, tags::PIXEL_SPACING).context("Missing PixelSpacing")?;
    if pixel_spacing.len() != 2 {
        bail!("Invalid PixelSpacing length: {}", pixel_spacing.len());
    }
    let dy = pixel_spacing[0];
    let dx = pixel_spacing[1];
    let origin = get_position(first).context("Missing ImagePositionPatient")?;

    let dz = if slices.len() > 1 {
        slice_spacing(&slices, &dir_x, &dir_y, &dir_z)?
    } else {
        get_f64(first, tags::SLICE_THICKNESS).unwrap_or(1.0)
    };

    let slice_pixels: Vec<Vec<f32>> = slices
        .par_iter()
        .map(|obj| {
            let pixel_data = obj.decode_pixel_data().context("Failed to decode pixel data")?;
            // Conversion to f32 already applies RescaleSlope/RescaleIntercept.
            let data = pixel_data
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Pixel data conversion error: {}", e))?;
            if data.len() != rows * cols {
                bail!("Slice data size mismatch: expected {}, got {}", rows * cols, data.len());
            }
            Ok(data)
        })
        .collect::<Result<Vec<_>>>()?;

    let depth = slices.len();
    let samples: Vec<f32> = slice_pixels.into_iter().flatten().collect();
    let metadata = ImageMetadata::new(
        Point::new([origin.x, origin.y, origin.z]),
        Spacing::new([dx, dy, dz]),
        Direction(Matrix3::from_columns(&[dir_x, dir_y, dir_z])),
    );

    info!(
        "Loaded series '{}' ({} x {} x {})",
        series.series_description, depth, rows, cols
    );
    let image = Image::from_samples(samples, [depth, rows, cols], &metadata, device)?;
    Ok(image)
}

/// Average slice spacing; fails on orientation changes or >1% spacing spread.
fn slice_spacing(
    slices: &[FileDicomObject<InMemDicomObject>],
    dir_x: &NaVector3<f64>,
    dir_y: &NaVector3<f64>,
    dir_z: &NaVector3<f64>,
) -> Result<f64> {
    let mut distances = Vec::with_capacity(slices.len() - 1);

    for pair in slices.windows(2) {
        let p1 = get_position(&pair[0]).context("Missing ImagePositionPatient")?;
        let p2 = get_position(&pair[1]).context("Missing ImagePositionPatient")?;
        distances.push((p2 - p1).dot(dir_z).abs());

        let orientation = get_f64_vec(&pair[1], tags::IMAGE_ORIENTATION_PATIENT).unwrap_or_default();
        if orientation.len() == 6 {
            let cx = NaVector3::new(orientation[0], orientation[1], orientation[2]);
            let cy = NaVector3::new(orientation[3], orientation[4], orientation[5]);
            if (cx - dir_x).norm() > 1e-3 || (cy - dir_y).norm() > 1e-3 {
                bail!("Inconsistent ImageOrientationPatient in series");
            }
        }
    }

    let min = distances.iter().copied().fold(f64::MAX, f64::min);
    let max = distances.iter().copied().fold(f64::MIN, f64::max);
    let avg = distances.iter().sum::<f64>() / distances.len() as f64;

    if (max - min) > 0.01 * avg {
        bail!("Non-uniform slice spacing detected: min={}, max={}, avg={}", min, max, avg);
    }
    Ok(avg)
}

// --- Helpers ---

fn get_string(obj: &FileDicomObject<InMemDicomObject>, tag: dicom::core::Tag) -> Option<String> {
    obj.element(tag).ok()?.to_str().ok().map(|s| s.trim().to_string())
}

fn get_u32(obj: &FileDicomObject<InMemDicomObject>, tag: dicom::core::Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_f64(obj: &FileDicomObject<InMemDicomObject>, tag: dicom::core::Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn get_f64_vec(obj: &FileDicomObject<InMemDicomObject>, tag: dicom::core::Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}

fn get_position(obj: &FileDicomObject<InMemDicomObject>) -> Option<NaPoint3<f64>> {
    let v = get_f64_vec(obj, tags::IMAGE_POSITION_PATIENT)?;
    if v.len() == 3 {
        Some(NaPoint3::new(v[0], v[1], v[2]))
    } else {
        None
    }
}
