//! JSON run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use resolute_core::error::{ResoluteError, Result};
use resolute_fusion::DEFAULT_HISTOGRAM_FILE;
use resolute_registration::{AntsEngine, DEFAULT_TEMPLATE};
use serde::{Deserialize, Serialize};

/// Complete configuration file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResoluteConfig {
    /// Directory receiving `resolute.log`; no file log when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub registration: RegistrationConfig,
    pub fusion: FusionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationConfig {
    /// Executable of the registration engine.
    #[serde(default = "default_engine")]
    pub engine: PathBuf,
    /// Argument template; the built-in default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub output_directory: PathBuf,
    #[serde(default)]
    pub output_prefix: String,
    /// UTE echo 1 as NIfTI. Replaced by the DICOM extraction when `--input` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,
    /// UTE echo 2 as NIfTI. Replaced by the DICOM extraction when `--input` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrac: Option<PathBuf>,
    pub mask: PathBuf,
    /// Joint histogram image; `null` disables writing it.
    #[serde(default = "default_histogram")]
    pub histogram: Option<PathBuf>,
    pub output: PathBuf,
}

fn default_engine() -> PathBuf {
    PathBuf::from(AntsEngine::DEFAULT_PROGRAM)
}

fn default_histogram() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_HISTOGRAM_FILE))
}

impl ResoluteConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ResoluteError::configuration(format!("reading {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ResoluteError::configuration(format!("parsing {}: {}", path.display(), e)))
    }

    /// Check that a run can start from this configuration.
    ///
    /// With `dicom_input` the reference, floating and MRAC volumes come from
    /// the DICOM extraction and need not be configured.
    pub fn validate(&self, dicom_input: bool) -> Result<()> {
        let registration = &self.registration;
        if registration.output_prefix.is_empty() {
            return Err(ResoluteError::configuration("registration.outputPrefix must not be empty"));
        }
        if registration.output_prefix.contains(['/', '\\']) {
            return Err(ResoluteError::configuration(format!(
                "registration.outputPrefix '{}' must not contain path separators",
                registration.output_prefix
            )));
        }
        if registration.engine.as_os_str().is_empty() {
            return Err(ResoluteError::configuration("registration.engine must not be empty"));
        }

        let mut required = vec![
            ("registration.outputDirectory", Some(&registration.output_directory)),
            ("fusion.mask", Some(&self.fusion.mask)),
            ("fusion.output", Some(&self.fusion.output)),
        ];
        if !dicom_input {
            required.push(("registration.reference", registration.reference.as_ref()));
            required.push(("registration.floating", registration.floating.as_ref()));
            required.push(("fusion.mrac", self.fusion.mrac.as_ref()));
        }
        for (key, value) in required {
            match value {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => return Err(ResoluteError::configuration(format!("{} is required", key))),
            }
        }
        Ok(())
    }

    /// A filled-in example to start a new configuration from.
    pub fn skeleton() -> Self {
        Self {
            log_dir: Some(PathBuf::from("/tmp/resolute/logs")),
            registration: RegistrationConfig {
                engine: default_engine(),
                parameters: Some(DEFAULT_TEMPLATE.to_string()),
                output_directory: PathBuf::from("/tmp/resolute/registration"),
                output_prefix: "ute2_to_ute1_".to_string(),
                reference: Some(PathBuf::from("/data/ute_echo1.nii.gz")),
                floating: Some(PathBuf::from("/data/ute_echo2.nii.gz")),
            },
            fusion: FusionConfig {
                mrac: Some(PathBuf::from("/data/mrac.nii.gz")),
                mask: PathBuf::from("/data/head_mask.nii.gz"),
                histogram: default_histogram(),
                output: PathBuf::from("/tmp/resolute/pseudo_ct.nii.gz"),
            },
        }
    }

    /// Write [`ResoluteConfig::skeleton`] as pretty JSON. Never overwrites.
    pub fn write_skeleton(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ResoluteError::configuration(format!(
                "{} already exists, not overwriting",
                path.display()
            )));
        }
        let json = serde_json::to_string_pretty(&Self::skeleton())
            .map_err(|e| ResoluteError::configuration(format!("serializing skeleton: {}", e)))?;
        fs::write(path, json + "\n")
            .map_err(|e| ResoluteError::io(format!("writing {}: {}", path.display(), e)))
    }
}
