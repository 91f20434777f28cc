//! Registration driver.
//!
//! Validates the reference/floating inputs and the output location, renders
//! the argument template, runs the engine and loads the warped results back
//! from disk.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use resolute_core::error::{ResoluteError, Result};
use resolute_core::image::Image;
use resolute_io::read_nifti;
use tracing::{debug, error, info, info_span, warn};

use crate::engine::{AntsEngine, RegistrationEngine};
use crate::template::{ArgumentTemplate, DEFAULT_TEMPLATE};

/// Suffix of the floating image resampled into the reference frame.
pub const WARPED_SUFFIX: &str = "Warped.nii.gz";
/// Suffix of the reference image resampled into the floating frame.
pub const INVERSE_WARPED_SUFFIX: &str = "InverseWarped.nii.gz";

/// Files a successful registration leaves in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutputs {
    pub warped: PathBuf,
    pub inverse_warped: PathBuf,
}

/// Drives one registration run per output directory and prefix.
///
/// Concurrent drivers targeting the same directory and prefix overwrite each
/// other's results.
pub struct RegistrationDriver<E: RegistrationEngine = AntsEngine> {
    engine: E,
    prefix: String,
    output_directory: Option<PathBuf>,
    reference: Option<PathBuf>,
    floating: Option<PathBuf>,
    template: String,
    default_template: bool,
}

impl RegistrationDriver<AntsEngine> {
    /// Driver for the `ANTS` executable found on `PATH`.
    pub fn new() -> Self {
        Self::with_engine(AntsEngine::default())
    }
}

impl Default for RegistrationDriver<AntsEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RegistrationEngine> RegistrationDriver<E> {
    pub fn with_engine(engine: E) -> Self {
        debug!("Initialised registration driver for {}", engine.name());
        Self {
            engine,
            prefix: String::new(),
            output_directory: None,
            reference: None,
            floating: None,
            template: DEFAULT_TEMPLATE.to_string(),
            default_template: true,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Use `dir` for the engine outputs, creating it (recursively) if needed.
    ///
    /// Fails if `dir` exists but is not a directory, or cannot be created.
    pub fn set_output_directory(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();

        if dir.exists() {
            if !dir.is_dir() {
                error!("Output directory: {} does not appear to be a directory!", dir.display());
                return Err(ResoluteError::configuration(format!(
                    "output directory {} does not appear to be a directory",
                    dir.display()
                )));
            }
        } else {
            fs::create_dir_all(dir).map_err(|e| {
                error!("Cannot create output folder : {}", dir.display());
                ResoluteError::configuration(format!(
                    "cannot create output folder {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            info!("Created output directory {}", dir.display());
        }

        self.output_directory = Some(dir.to_path_buf());
        Ok(())
    }

    /// Prefix prepended to every engine output file name.
    pub fn set_output_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Fixed image; must be an existing regular file.
    pub fn set_reference_file_name(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.reference = Some(existing_file(path.as_ref(), "reference")?);
        Ok(())
    }

    /// Moving image; must be an existing regular file.
    pub fn set_floating_file_name(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.floating = Some(existing_file(path.as_ref(), "floating")?);
        Ok(())
    }

    /// Replace the built-in template with a caller-supplied command line.
    pub fn set_parameter_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
        self.default_template = false;
    }

    /// Whether the built-in template is still in effect.
    pub fn uses_default_template(&self) -> bool {
        self.default_template
    }

    /// `output_directory / prefix`, the value substituted for `PREFIX`.
    pub fn output_prefix_path(&self) -> Result<PathBuf> {
        let dir = self.output_directory.as_ref().ok_or_else(|| {
            ResoluteError::configuration("output directory has not been set")
        })?;
        Ok(dir.join(&self.prefix))
    }

    /// Expected location of the forward-warped (floating in reference frame) image.
    pub fn warped_image_path(&self) -> Result<PathBuf> {
        Ok(with_suffix(self.output_prefix_path()?, WARPED_SUFFIX))
    }

    /// Expected location of the inverse-warped (reference in floating frame) image.
    pub fn inverse_warped_image_path(&self) -> Result<PathBuf> {
        Ok(with_suffix(self.output_prefix_path()?, INVERSE_WARPED_SUFFIX))
    }

    /// Render the active template into the engine argument vector.
    ///
    /// Fails before anything runs if an input or the output directory is unset.
    pub fn resolve_arguments(&self) -> Result<Vec<String>> {
        let full_prefix = self.output_prefix_path()?;
        let reference = self
            .reference
            .as_ref()
            .ok_or_else(|| ResoluteError::configuration("reference image has not been set"))?;
        let floating = self
            .floating
            .as_ref()
            .ok_or_else(|| ResoluteError::configuration("floating image has not been set"))?;

        let mut template = ArgumentTemplate::new(self.template.as_str());
        template.insert("FLOAT", &floating.to_string_lossy());
        template.insert("REF", &reference.to_string_lossy());
        template.insert("PREFIX", &full_prefix.to_string_lossy());

        for key in template.unresolved_keys() {
            warn!("Template key <%%{}%%> left unresolved", key);
        }

        if self.default_template {
            warn!("No registration parameters set, using default parameters!");
        }

        info!("Registration parameters:");
        info!("{}", template);

        let args = template.tokenize();
        for (i, arg) in args.iter().enumerate() {
            debug!("{}\t\t{}", i + 1, arg);
        }
        Ok(args)
    }

    /// Run the registration, blocking until the engine returns.
    pub fn update(&mut self) -> Result<RegistrationOutputs> {
        let span = info_span!("registration", engine = self.engine.name());
        let _guard = span.enter();

        let args = self.resolve_arguments()?;
        let outputs = RegistrationOutputs {
            warped: self.warped_image_path()?,
            inverse_warped: self.inverse_warped_image_path()?,
        };

        info!("Starting {} registration. This will take a while...", self.engine.name());
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        if let Err(e) = self.engine.run(&args) {
            error!("Registration failed: {}", e);
            return Err(e);
        }

        info!("Registration complete!");
        Ok(outputs)
    }

    /// Load the forward-warped image. Re-reads the file on every call.
    pub fn get_output_image<B: Backend>(&self, device: &B::Device) -> Result<Image<B, 3>> {
        load_output(&self.warped_image_path()?, device)
    }

    /// Load the inverse-warped image. Re-reads the file on every call.
    pub fn get_output_inverse_image<B: Backend>(&self, device: &B::Device) -> Result<Image<B, 3>> {
        load_output(&self.inverse_warped_image_path()?, device)
    }
}

fn existing_file(path: &Path, role: &str) -> Result<PathBuf> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
        Ok(_) => {
            error!("Cannot find {} image file : {}", role, path.display());
            Err(ResoluteError::input_not_found(format!(
                "{} image {} is not a regular file",
                role,
                path.display()
            )))
        }
        Err(e) => {
            error!("Cannot find {} image file : {}", role, path.display());
            Err(ResoluteError::input_not_found(format!(
                "{} image {}: {}",
                role,
                path.display(),
                e
            )))
        }
    }
}

fn with_suffix(prefix: PathBuf, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn load_output<B: Backend>(path: &Path, device: &B::Device) -> Result<Image<B, 3>> {
    match read_nifti::<B, _>(path, device) {
        Ok(image) => {
            info!("Read {} successfully.", path.display());
            Ok(image)
        }
        Err(e) => {
            error!("Unable to read image {}", path.display());
            Err(ResoluteError::io(format!(
                "unable to read image {}: {:#}",
                path.display(),
                e
            )))
        }
    }
}
