//! Tissue-class synthesis extension point.
//!
//! The fusion filter computes the joint UTE histogram and allocates the output
//! volume on the MRAC grid; turning that into pseudo-CT values is delegated to
//! an implementation of [`TissueSynthesis`].

use burn::tensor::backend::Backend;
use resolute_core::error::Result;
use resolute_core::image::{Image, MaskImage};

use crate::histogram::JointHistogram;

/// Read-only view of the inputs of one fusion run.
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a, B: Backend> {
    pub mrac: &'a Image<B, 3>,
    pub ute_echo1: &'a Image<B, 3>,
    pub ute_echo2: &'a Image<B, 3>,
    pub mask: &'a MaskImage<B>,
}

/// Fills the fused output volume.
pub trait TissueSynthesis<B: Backend> {
    /// Produce the output volume from the inputs and their joint histogram.
    ///
    /// `output` is zero-filled on the MRAC grid. The returned volume must keep
    /// that geometry.
    fn synthesize(
        &self,
        inputs: FusionInputs<'_, B>,
        histogram: &JointHistogram,
        output: Image<B, 3>,
    ) -> Result<Image<B, 3>>;
}
