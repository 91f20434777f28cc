pub mod histogram;
pub mod synthesis;
pub mod filter;

pub use filter::{FusionSlot, HistogramFusionFilter, DEFAULT_HISTOGRAM_FILE};
pub use histogram::{JointHistogram, JointHistogramEngine};
pub use synthesis::{FusionInputs, TissueSynthesis};
