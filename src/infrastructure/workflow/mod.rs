//! Workflow infrastructure implementations

mod engine_impl;
mod loader;

pub use engine_impl::{WorkflowEngineImpl, INVALID_FORMAT_MESSAGE, INVALID_NUMBER_MESSAGE};
pub use loader::{DocumentFormat, WorkflowLoader};
