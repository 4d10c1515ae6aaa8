/// Store modules that hold console state.
/// The workflow store owns the whole workflow state; log sessions are owned
/// by the log stream controller instead.
pub mod workflow_store;

pub use workflow_store::{reduce, WorkflowPhase, WorkflowState, WorkflowStore};
