use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Lifecycle of a pipeline stage.
///
/// `Unconfigured -> Configured` once every required slot is bound,
/// `Configured -> Executed` on a successful run, and `Failed` when any step of
/// a run returns an error. Rebinding a slot returns an executed or failed stage
/// to `Configured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Unconfigured,
    Configured,
    Executed,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageState::Unconfigured => "unconfigured",
            StageState::Configured => "configured",
            StageState::Executed => "executed",
            StageState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A multi-input processing stage.
pub trait PipelineStage {
    /// Named input slot.
    type Slot: Copy + fmt::Debug;
    /// Volume type accepted by the slots.
    type Input;
    /// Result of one execution.
    type Output;

    /// Bind a shared input volume to `slot`, replacing any previous binding.
    fn bind(&mut self, slot: Self::Slot, volume: Arc<Self::Input>);

    /// Run the stage on the bound inputs.
    fn execute(&mut self) -> Result<Self::Output>;

    /// Current lifecycle state.
    fn state(&self) -> StageState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(StageState::Unconfigured.to_string(), "unconfigured");
        assert_eq!(StageState::Executed.to_string(), "executed");
    }
}
