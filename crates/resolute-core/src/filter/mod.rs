//! Pipeline stage abstraction.
//!
//! A stage binds its inputs into named slots and produces one output per
//! execution. Inputs are shared read-only references; a stage only mutates the
//! volumes it allocates itself.

pub mod stage;

pub use stage::{PipelineStage, StageState};
