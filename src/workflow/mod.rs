// Workflow orchestration - one job through conversion and its refinements
pub mod controller;
pub mod state;

pub use controller::{validate_source_url, VideoWorkflowController};
pub use state::{Intent, WorkflowState};
