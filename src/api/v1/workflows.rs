//! Workflow session endpoints
//!
//! The server keeps no sessions: `start` hands the client a state value and
//! every `answer` call sends it back.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::workflow::{AdvanceOutcome, QuestionType, State as SessionState, Workflow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub title: String,
    pub version: String,
    pub steps: Vec<StepOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutline {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuestionOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutline {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub derived: bool,
}

impl From<&Workflow> for WorkflowResponse {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id().to_string(),
            title: workflow.title().to_string(),
            version: workflow.version().to_string(),
            steps: workflow
                .steps()
                .iter()
                .map(|step| StepOutline {
                    id: step.id.clone(),
                    title: step.title.clone(),
                    questions: step
                        .ask
                        .iter()
                        .map(|q| QuestionOutline {
                            id: q.id.clone(),
                            label: q.label.clone(),
                            question_type: q.question_type,
                            derived: q.is_derived(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Body of an answer submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// State returned by the previous call
    pub state: SessionState,

    /// Answer to the pending question; omit or send null to re-fetch it
    #[serde(default)]
    pub value: Option<Value>,
}

/// GET /v1/workflow
pub async fn get_workflow(State(state): State<AppState>) -> Json<WorkflowResponse> {
    Json(WorkflowResponse::from(state.workflow.as_ref()))
}

/// POST /v1/workflow/start
pub async fn start_session(
    State(state): State<AppState>,
) -> Result<Json<AdvanceOutcome>, ApiError> {
    debug!(workflow_id = %state.workflow.id(), "Starting session");

    let outcome = state
        .engine
        .start_session(&state.workflow)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to start session"))?;

    Ok(Json(outcome))
}

/// POST /v1/workflow/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AdvanceOutcome>, ApiError> {
    debug!(
        workflow_id = %state.workflow.id(),
        step_id = %request.state.current_step_id,
        has_value = request.value.is_some(),
        "Advancing session"
    );

    let outcome = state
        .engine
        .advance(&state.workflow, &request.state, request.value)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to advance session"))?;

    Ok(Json(outcome))
}
