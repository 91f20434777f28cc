//! Error types shared by every stage of the pipeline.
//!
//! Each variant carries enough context (offending path, operation) to diagnose
//! a failed run from the log alone.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum ResoluteError {
    /// Unusable output directory, missing or malformed configuration values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required input file does not exist or is not a regular file.
    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// Histogram or synthesis computation failed on the given data.
    #[error("Computation error: {0}")]
    Computation(String),

    /// An expected artifact could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),

    /// The external registration engine could not be started or reported failure.
    #[error("Registration engine failed: {0}")]
    EngineFailed(String),

    /// Two volumes that must be sampled voxel-for-voxel have different shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ResoluteError>;

impl ResoluteError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an input-not-found error.
    pub fn input_not_found(msg: impl Into<String>) -> Self {
        Self::InputNotFound(msg.into())
    }

    /// Create a computation error.
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create an engine failure error.
    pub fn engine_failed(msg: impl Into<String>) -> Self {
        Self::EngineFailed(msg.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
