//! Four-input fusion stage producing a pseudo-CT volume.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::tensor::backend::Backend;
use resolute_core::error::{ResoluteError, Result};
use resolute_core::filter::{PipelineStage, StageState};
use resolute_core::image::{Image, MaskImage};
use tracing::{debug, info, info_span, warn};

use crate::histogram::{JointHistogram, JointHistogramEngine};
use crate::synthesis::{FusionInputs, TissueSynthesis};

/// Where the joint histogram image is written unless configured otherwise.
pub const DEFAULT_HISTOGRAM_FILE: &str = "histo.nii.gz";

/// Input slots of [`HistogramFusionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionSlot {
    /// Vendor attenuation map; defines the output grid.
    Mrac,
    /// First UTE echo, channel A of the histogram.
    Ute1,
    /// Second UTE echo, channel B of the histogram.
    Ute2,
    /// Voxels counted into the histogram.
    Mask,
}

impl FusionSlot {
    pub const ALL: [FusionSlot; 4] = [FusionSlot::Mrac, FusionSlot::Ute1, FusionSlot::Ute2, FusionSlot::Mask];

    fn index(self) -> usize {
        match self {
            FusionSlot::Mrac => 0,
            FusionSlot::Ute1 => 1,
            FusionSlot::Ute2 => 2,
            FusionSlot::Mask => 3,
        }
    }
}

impl fmt::Display for FusionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FusionSlot::Mrac => "MRAC image",
            FusionSlot::Ute1 => "UTE echo 1",
            FusionSlot::Ute2 => "UTE echo 2",
            FusionSlot::Mask => "mask image",
        };
        f.write_str(name)
    }
}

/// Fuses an MRAC map with two UTE echoes through their joint histogram.
///
/// Inputs are shared and never modified. Each run allocates a fresh output
/// with the MRAC geometry, histograms UTE echo 1 against echo 2 inside the
/// mask, optionally writes the histogram as a 2-D image, and hands everything
/// to the configured [`TissueSynthesis`].
pub struct HistogramFusionFilter<B: Backend> {
    inputs: [Option<Arc<Image<B, 3>>>; 4],
    engine: JointHistogramEngine,
    histogram_path: Option<PathBuf>,
    synthesis: Option<Box<dyn TissueSynthesis<B>>>,
    histogram: Option<JointHistogram>,
    state: StageState,
}

impl<B: Backend> HistogramFusionFilter<B> {
    pub fn new() -> Self {
        Self {
            inputs: [None, None, None, None],
            engine: JointHistogramEngine::new(),
            histogram_path: Some(PathBuf::from(DEFAULT_HISTOGRAM_FILE)),
            synthesis: None,
            histogram: None,
            state: StageState::Unconfigured,
        }
    }

    /// Install the synthesis step that populates the output.
    pub fn with_synthesis(mut self, synthesis: Box<dyn TissueSynthesis<B>>) -> Self {
        self.synthesis = Some(synthesis);
        self
    }

    /// Destination of the histogram image; `None` skips writing it.
    pub fn set_histogram_path(&mut self, path: Option<PathBuf>) {
        self.histogram_path = path;
    }

    pub fn histogram_path(&self) -> Option<&Path> {
        self.histogram_path.as_deref()
    }

    pub fn set_mrac_image(&mut self, image: Arc<Image<B, 3>>) {
        self.bind(FusionSlot::Mrac, image);
    }

    pub fn set_ute_image1(&mut self, image: Arc<Image<B, 3>>) {
        self.bind(FusionSlot::Ute1, image);
    }

    pub fn set_ute_image2(&mut self, image: Arc<Image<B, 3>>) {
        self.bind(FusionSlot::Ute2, image);
    }

    pub fn set_mask_image(&mut self, image: Arc<MaskImage<B>>) {
        self.bind(FusionSlot::Mask, image);
    }

    /// Volume bound to `slot`, if any.
    pub fn input(&self, slot: FusionSlot) -> Option<&Arc<Image<B, 3>>> {
        self.inputs[slot.index()].as_ref()
    }

    /// Slots that still need a volume.
    pub fn missing_slots(&self) -> Vec<FusionSlot> {
        FusionSlot::ALL
            .into_iter()
            .filter(|slot| self.inputs[slot.index()].is_none())
            .collect()
    }

    /// Histogram of the last successful run.
    pub fn histogram(&self) -> Option<&JointHistogram> {
        self.histogram.as_ref()
    }

    fn bound(&self, slot: FusionSlot) -> Result<Arc<Image<B, 3>>> {
        self.inputs[slot.index()]
            .clone()
            .ok_or_else(|| ResoluteError::configuration(format!("{} is not set", slot)))
    }

    fn run(&self) -> Result<(Image<B, 3>, JointHistogram)> {
        let mrac = self.bound(FusionSlot::Mrac)?;
        let ute1 = self.bound(FusionSlot::Ute1)?;
        let ute2 = self.bound(FusionSlot::Ute2)?;
        let mask = self.bound(FusionSlot::Mask)?;

        let output = mrac.zeros_like();
        debug!("Allocated output volume {:?} on the MRAC grid", output.shape());

        if !ute1.has_same_geometry(&ute2) {
            warn!("UTE echoes do not share the same geometry; pairing voxels by index");
        }

        let histogram = self.engine.compute(&*ute1, &*ute2, Some(&*mask))?;
        debug!("Calculated histogram.");

        if let Some(path) = &self.histogram_path {
            let image = histogram.to_image::<B>(&mrac.data().device())?;
            resolute_io::write_histogram_nifti(path, &image).map_err(|e| {
                ResoluteError::io(format!("writing histogram to {}: {:#}", path.display(), e))
            })?;
            info!("Wrote joint histogram to {}", path.display());
        }

        let inputs = FusionInputs {
            mrac: &mrac,
            ute_echo1: &ute1,
            ute_echo2: &ute2,
            mask: &mask,
        };
        let output = match &self.synthesis {
            Some(synthesis) => {
                let fused = synthesis.synthesize(inputs, &histogram, output)?;
                if !fused.has_same_geometry(&mrac) {
                    return Err(ResoluteError::computation(
                        "synthesized volume does not match the MRAC geometry",
                    ));
                }
                fused
            }
            None => {
                warn!("No tissue synthesis configured; output volume left zero-filled");
                output
            }
        };

        Ok((output, histogram))
    }
}

impl<B: Backend> Default for HistogramFusionFilter<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PipelineStage for HistogramFusionFilter<B> {
    type Slot = FusionSlot;
    type Input = Image<B, 3>;
    type Output = Image<B, 3>;

    fn bind(&mut self, slot: FusionSlot, volume: Arc<Image<B, 3>>) {
        self.inputs[slot.index()] = Some(volume);
        self.state = if self.missing_slots().is_empty() {
            StageState::Configured
        } else {
            StageState::Unconfigured
        };
    }

    fn execute(&mut self) -> Result<Image<B, 3>> {
        let _span = info_span!("fusion").entered();

        let missing = self.missing_slots();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Err(ResoluteError::configuration(format!(
                "fusion inputs not set: {}",
                names.join(", ")
            )));
        }

        match self.run() {
            Ok((output, histogram)) => {
                self.histogram = Some(histogram);
                self.state = StageState::Executed;
                Ok(output)
            }
            Err(e) => {
                self.histogram = None;
                self.state = StageState::Failed;
                Err(e)
            }
        }
    }

    fn state(&self) -> StageState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use resolute_core::image::ImageMetadata;
    use resolute_core::spatial::{Direction, Point, Spacing};

    type B = NdArray<f32>;

    fn volume(value: f32, shape: [usize; 3]) -> Arc<Image<B, 3>> {
        let device = Default::default();
        let n = shape.iter().product();
        Arc::new(Image::from_samples(vec![value; n], shape, &ImageMetadata::default(), &device).unwrap())
    }

    fn configured_filter() -> HistogramFusionFilter<B> {
        let mut filter = HistogramFusionFilter::new();
        filter.set_histogram_path(None);
        filter.set_mrac_image(volume(0.0, [2, 3, 4]));
        filter.set_ute_image1(volume(1.0, [2, 2, 2]));
        filter.set_ute_image2(volume(2.0, [2, 2, 2]));
        filter.set_mask_image(volume(1.0, [2, 2, 2]));
        filter
    }

    #[test]
    fn test_state_follows_bindings() {
        let mut filter = HistogramFusionFilter::<B>::new();
        assert_eq!(filter.state(), StageState::Unconfigured);
        assert_eq!(filter.missing_slots().len(), 4);

        filter.set_mrac_image(volume(0.0, [1, 1, 1]));
        filter.set_ute_image1(volume(0.0, [1, 1, 1]));
        filter.set_ute_image2(volume(0.0, [1, 1, 1]));
        assert_eq!(filter.state(), StageState::Unconfigured);
        assert_eq!(filter.missing_slots(), vec![FusionSlot::Mask]);

        filter.set_mask_image(volume(1.0, [1, 1, 1]));
        assert_eq!(filter.state(), StageState::Configured);
    }

    #[test]
    fn test_missing_inputs_are_named() {
        let mut filter = HistogramFusionFilter::<B>::new();
        filter.set_ute_image1(volume(0.0, [1, 1, 1]));
        let err = filter.execute().unwrap_err();
        assert!(matches!(err, ResoluteError::Configuration(_)));
        let message = err.to_string();
        assert!(message.contains("MRAC image"));
        assert!(message.contains("UTE echo 2"));
        assert!(message.contains("mask image"));
        assert!(!message.contains("UTE echo 1"));
        assert_eq!(filter.state(), StageState::Unconfigured);
    }

    #[test]
    fn test_output_takes_mrac_geometry() {
        let device = Default::default();
        let metadata = ImageMetadata::new(
            Point::new([-10.0, 4.0, 2.5]),
            Spacing::new([0.8, 0.8, 2.0]),
            Direction::identity(),
        );
        let mrac = Arc::new(Image::<B, 3>::from_samples(vec![5.0; 24], [2, 3, 4], &metadata, &device).unwrap());

        let mut filter = configured_filter();
        filter.set_mrac_image(mrac.clone());
        let output = filter.execute().unwrap();

        assert!(output.has_same_geometry(&mrac));
        assert!(output.samples().unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(filter.state(), StageState::Executed);
        assert_eq!(filter.histogram().unwrap().total_frequency(), 8);
    }

    #[test]
    fn test_failed_run_marks_stage_failed() {
        let mut filter = configured_filter();
        filter.set_mask_image(volume(1.0, [1, 2, 2]));
        let err = filter.execute().unwrap_err();
        assert!(matches!(err, ResoluteError::ShapeMismatch { .. }));
        assert_eq!(filter.state(), StageState::Failed);
        assert!(filter.histogram().is_none());

        filter.set_mask_image(volume(1.0, [2, 2, 2]));
        assert_eq!(filter.state(), StageState::Configured);
        assert!(filter.execute().is_ok());
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let mut filter = configured_filter();
        let ute1 = filter.input(FusionSlot::Ute1).unwrap().clone();
        filter.execute().unwrap();
        assert!(ute1.samples().unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_default_histogram_path() {
        let filter = HistogramFusionFilter::<B>::default();
        assert_eq!(filter.histogram_path(), Some(Path::new(DEFAULT_HISTOGRAM_FILE)));
    }
}
