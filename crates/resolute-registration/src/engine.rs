//! The seam between the driver and the numerical registration engine.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use resolute_core::error::{ResoluteError, Result};

/// Something that can run a registration given a resolved argument vector.
///
/// The engine writes `<prefix>Warped.nii.gz` and `<prefix>InverseWarped.nii.gz`
/// where `<prefix>` is the value following `-o`.
pub trait RegistrationEngine {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Run synchronously, returning once the engine has finished.
    fn run(&self, args: &[String]) -> Result<()>;
}

/// The ANTs `ANTS` executable, run as a child process.
///
/// The child inherits stdout/stderr so its progress output stays visible.
/// There is no timeout: a hung engine blocks the caller.
#[derive(Debug, Clone)]
pub struct AntsEngine {
    program: PathBuf,
}

impl AntsEngine {
    /// Executable looked up on `PATH` when none is configured.
    pub const DEFAULT_PROGRAM: &'static str = "ANTS";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for AntsEngine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl RegistrationEngine for AntsEngine {
    fn name(&self) -> &str {
        "ANTs"
    }

    fn run(&self, args: &[String]) -> Result<()> {
        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| {
                ResoluteError::engine_failed(format!(
                    "could not start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ResoluteError::engine_failed(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_fails_to_start() {
        let engine = AntsEngine::new("/non/existent/bin/ANTS");
        let err = engine.run(&["3".to_string()]).unwrap_err();
        assert!(matches!(err, ResoluteError::EngineFailed(_)));
        assert!(err.to_string().contains("could not start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported() {
        let engine = AntsEngine::new("false");
        let err = engine.run(&[]).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        let engine = AntsEngine::new("true");
        assert!(engine.run(&["ignored".to_string()]).is_ok());
    }
}
