//! Step-by-step progress report for finished or blocked sessions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::{Workflow, DONE_STEP_ID};
use super::state::State;

const COMPLETED_MESSAGE: &str = "All steps have been completed.";

/// Progress of a single step relative to the blocking step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Blocked,
    Pending,
}

/// A declared question and its recorded answer, if any
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionSummary {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSummary {
    pub id: String,
    pub title: String,
    pub status: StepStatus,
    pub questions: Vec<QuestionSummary>,
}

/// Completion or blocked-state report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowSummary {
    /// True only when the session reached the terminal step
    pub completed: bool,
    pub message: String,
    pub steps: Vec<StepSummary>,
}

impl WorkflowSummary {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn step(&self, id: &str) -> Option<&StepSummary> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Summarize the session relative to `blocking_step_id`
///
/// Steps declared before the blocking step are completed, the blocking step
/// is blocked and everything after it is pending. Passing the terminal step
/// id produces a completed report.
pub fn summarize(workflow: &Workflow, state: &State, blocking_step_id: &str) -> WorkflowSummary {
    let completed = blocking_step_id == DONE_STEP_ID;
    let mut passed_blocking = false;

    let steps = workflow
        .steps()
        .iter()
        .filter(|step| !step.is_terminal())
        .map(|step| {
            let status = if passed_blocking {
                StepStatus::Pending
            } else if step.id == blocking_step_id {
                passed_blocking = true;
                StepStatus::Blocked
            } else {
                StepStatus::Completed
            };

            let questions = step
                .ask
                .iter()
                .map(|q| QuestionSummary {
                    id: q.id.clone(),
                    label: q.label.clone(),
                    answer: state.answers.get(&q.id).cloned(),
                })
                .collect();

            StepSummary {
                id: step.id.clone(),
                title: step.title.clone(),
                status,
                questions,
            }
        })
        .collect();

    let message = if completed {
        COMPLETED_MESSAGE.to_string()
    } else {
        let title = workflow
            .step(blocking_step_id)
            .map(|s| s.title.as_str())
            .unwrap_or(blocking_step_id);
        format!("The workflow cannot continue past '{}'.", title)
    };

    WorkflowSummary {
        completed,
        message,
        steps,
    }
}
