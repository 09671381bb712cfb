//! Release pipeline orchestration.
//!
//! The pipeline is a fixed three-task graph:
//!
//! ```text
//! stage A:  build-windows ──┐
//!                           ├──▶ stage B: merge
//!           build-linux ────┘
//! ```
//!
//! Stage A tasks run concurrently; the merge task runs only when both
//! succeeded and is otherwise recorded as skipped.

mod dry_run;
mod orchestrator;
mod report;
mod task;

pub use dry_run::{RecordedCall, Recorder, RecordingDeleter, RecordingToolchain};
pub use orchestrator::Orchestrator;
pub use report::PipelineReport;
pub use task::{Stage, StepRecord, TaskId, TaskOutcome, TaskReport, TaskRun};
