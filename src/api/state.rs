//! Application state shared by the HTTP handlers

use std::fmt;
use std::sync::Arc;

use crate::domain::guidance::GuidanceProvider;
use crate::domain::workflow::{Workflow, WorkflowEngine};

/// Process-wide, read-only state
///
/// Session state is never stored here: clients send it with every request.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub engine: Arc<dyn WorkflowEngine>,
    pub guidance: Arc<dyn GuidanceProvider>,
}

impl AppState {
    pub fn new(
        workflow: Arc<Workflow>,
        engine: Arc<dyn WorkflowEngine>,
        guidance: Arc<dyn GuidanceProvider>,
    ) -> Self {
        Self {
            workflow,
            engine,
            guidance,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("workflow", &self.workflow.id())
            .field("engine", &self.engine)
            .field("guidance", &self.guidance.provider_type())
            .finish()
    }
}
