//! Workflow engine trait and turn outcome types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::{Question, QuestionType, Step, Workflow};
use super::error::WorkflowError;
use super::state::State;
use super::summary::WorkflowSummary;
use crate::domain::guidance::Guidance;

/// Where the session stands after a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// A question is waiting for the user
    AwaitingAnswer,

    /// The current step has nothing left to ask; the next turn computes and
    /// transitions
    Computing,

    /// An advisory rule ended the session early
    Terminated,

    /// The terminal step was reached
    Done,
}

impl SessionStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Terminated | Self::Done)
    }
}

/// What the UI layer should render for this turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiDescriptor {
    pub step_id: String,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,

    /// Label of the question to ask
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    /// Validation message for a rejected answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UiDescriptor {
    /// Descriptor for a step, optionally asking a question
    pub fn for_step(step: &Step, question: Option<&Question>, help: Option<String>) -> Self {
        Self {
            step_id: step.id.clone(),
            title: step.title.clone(),
            question_id: question.map(|q| q.id.clone()),
            question: question.map(|q| q.label.clone()),
            question_type: question.map(|q| q.question_type),
            help,
            choices: question.and_then(|q| q.options.clone()),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Result of a single turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvanceOutcome {
    /// Updated session state; the caller persists it for the next turn
    pub state: State,

    pub ui: UiDescriptor,

    pub status: SessionStatus,

    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<WorkflowSummary>,

    /// Advisory text when an advisory rule terminated the session
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice: Vec<String>,
}

impl AdvanceOutcome {
    pub fn new(state: State, ui: UiDescriptor, status: SessionStatus, guidance: Guidance) -> Self {
        Self {
            state,
            ui,
            status,
            citations: guidance.citations,
            summary: None,
            advice: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: WorkflowSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_advice(mut self, advice: Vec<String>) -> Self {
        self.advice = advice;
        self
    }

    /// Whether the submitted answer was rejected
    pub fn is_rejected(&self) -> bool {
        self.ui.error.is_some()
    }
}

/// Drives a session through a workflow, one turn at a time
///
/// Every call is a function of its explicit arguments: the engine keeps no
/// session state between calls, so one engine serves any number of sessions.
#[async_trait]
pub trait WorkflowEngine: Send + Sync + std::fmt::Debug {
    /// Create a session at the first step and run its first turn
    async fn start_session(&self, workflow: &Workflow) -> Result<AdvanceOutcome, WorkflowError>;

    /// Run one turn, optionally submitting an answer to the pending question
    async fn advance(
        &self,
        workflow: &Workflow,
        state: &State,
        input: Option<Value>,
    ) -> Result<AdvanceOutcome, WorkflowError>;
}
