//! End-to-end RESOLUTE run: register UTE echo 2 onto echo 1, then fuse.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use burn_ndarray::NdArray;
use resolute_core::PipelineStage;
use resolute_fusion::{FusionSlot, HistogramFusionFilter};
use resolute_io::{identify_ute_series, load_dicom_series, read_nifti, scan_dicom_directory, write_nifti};
use resolute_registration::{RegistrationDriver, RegistrationEngine};
use tracing::info;

use crate::config::ResoluteConfig;

/// Runtime tensor backend.
pub type Backend = NdArray<f32>;

/// The three scanner volumes a run starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InputVolumes {
    reference: PathBuf,
    floating: PathBuf,
    mrac: PathBuf,
}

impl InputVolumes {
    fn from_config(config: &ResoluteConfig) -> Result<Self> {
        let missing = |key: &str| anyhow::anyhow!("{} is not configured", key);
        Ok(Self {
            reference: config.registration.reference.clone().ok_or_else(|| missing("registration.reference"))?,
            floating: config.registration.floating.clone().ok_or_else(|| missing("registration.floating"))?,
            mrac: config.fusion.mrac.clone().ok_or_else(|| missing("fusion.mrac"))?,
        })
    }
}

/// Pull the MRAC and both UTE echoes out of a DICOM session into `target`.
fn extract_dicom(dicom_dir: &Path, target: &Path) -> Result<InputVolumes> {
    let device = Default::default();
    let series = scan_dicom_directory(dicom_dir)?;
    let ute = identify_ute_series(&series)
        .with_context(|| format!("identifying UTE series in {}", dicom_dir.display()))?;

    let volumes = InputVolumes {
        reference: target.join("ute_echo1.nii.gz"),
        floating: target.join("ute_echo2.nii.gz"),
        mrac: target.join("mrac.nii.gz"),
    };
    for (info, path) in [
        (&ute.ute_echo1, &volumes.reference),
        (&ute.ute_echo2, &volumes.floating),
        (&ute.mrac, &volumes.mrac),
    ] {
        let image = load_dicom_series::<Backend>(info, &device)?;
        write_nifti(path, &image)?;
        info!("Extracted series '{}' to {}", info.series_description, path.display());
    }
    Ok(volumes)
}

/// Run registration and fusion; returns the path of the written volume.
pub fn run<E: RegistrationEngine>(config: &ResoluteConfig, dicom_input: Option<&Path>, engine: E) -> Result<PathBuf> {
    let device = Default::default();
    let registration = &config.registration;

    let mut driver = RegistrationDriver::with_engine(engine);
    driver.set_output_directory(&registration.output_directory)?;
    driver.set_output_prefix(registration.output_prefix.as_str());

    let volumes = match dicom_input {
        Some(dir) => extract_dicom(dir, &registration.output_directory)?,
        None => InputVolumes::from_config(config)?,
    };
    driver.set_reference_file_name(&volumes.reference)?;
    driver.set_floating_file_name(&volumes.floating)?;
    if let Some(parameters) = &registration.parameters {
        driver.set_parameter_template(parameters.as_str());
    }

    let outputs = driver.update()?;
    info!("Warped image: {}", outputs.warped.display());

    let ute1 = read_nifti::<Backend, _>(&volumes.reference, &device)
        .with_context(|| format!("reading reference {}", volumes.reference.display()))?;
    let ute2 = driver.get_output_image::<Backend>(&device)?;
    let mrac = read_nifti::<Backend, _>(&volumes.mrac, &device)
        .with_context(|| format!("reading MRAC {}", volumes.mrac.display()))?;
    let mask = read_nifti::<Backend, _>(&config.fusion.mask, &device)
        .with_context(|| format!("reading mask {}", config.fusion.mask.display()))?;

    let mut filter = HistogramFusionFilter::<Backend>::new();
    filter.set_histogram_path(config.fusion.histogram.clone());
    filter.bind(FusionSlot::Mrac, Arc::new(mrac));
    filter.bind(FusionSlot::Ute1, Arc::new(ute1));
    filter.bind(FusionSlot::Ute2, Arc::new(ute2));
    filter.bind(FusionSlot::Mask, Arc::new(mask));
    let fused = filter.execute()?;

    let output = &config.fusion.output;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    write_nifti(output, &fused).with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote output volume to {}", output.display());

    Ok(output.clone())
}
