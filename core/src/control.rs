// core/src/control.rs

//! Flow-control signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Run the remaining hooks of this step, then the next step.
  Continue,
  /// Halt the run without an error. Nothing after this handler executes.
  Stop,
}

/// Outcome of [`crate::Pipeline::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}
