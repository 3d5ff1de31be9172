//! Workflow error types

use thiserror::Error;

/// Errors that can occur while loading or advancing a workflow
///
/// Answer validation failures are not represented here: they are reported to
/// the user through the UI descriptor and never abort a turn.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Workflow has no steps: {0}")]
    EmptyWorkflow(String),

    #[error("Invalid workflow definition '{workflow}': {}", issues.join("; "))]
    InvalidDefinition {
        workflow: String,
        issues: Vec<String>,
    },

    #[error("Unknown ruleset: {0}")]
    UnknownRuleset(String),

    #[error("Ruleset already registered: {0}")]
    DuplicateRuleset(String),

    #[error("Ruleset '{ruleset}' failed: {message}")]
    RulesetExecution { ruleset: String, message: String },

    #[error("Failed to load workflow from '{path}': {message}")]
    Load { path: String, message: String },
}

impl WorkflowError {
    pub fn step_not_found(id: impl Into<String>) -> Self {
        Self::StepNotFound(id.into())
    }

    pub fn empty_workflow(id: impl Into<String>) -> Self {
        Self::EmptyWorkflow(id.into())
    }

    pub fn invalid_definition(workflow: impl Into<String>, issues: Vec<String>) -> Self {
        Self::InvalidDefinition {
            workflow: workflow.into(),
            issues,
        }
    }

    pub fn unknown_ruleset(name: impl Into<String>) -> Self {
        Self::UnknownRuleset(name.into())
    }

    pub fn duplicate_ruleset(name: impl Into<String>) -> Self {
        Self::DuplicateRuleset(name.into())
    }

    pub fn ruleset_execution(ruleset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RulesetExecution {
            ruleset: ruleset.into(),
            message: message.into(),
        }
    }

    pub fn load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error reflects a defect in the workflow definition or the
    /// host's ruleset registration rather than in a single request
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyWorkflow(_)
                | Self::InvalidDefinition { .. }
                | Self::UnknownRuleset(_)
                | Self::DuplicateRuleset(_)
                | Self::Load { .. }
        )
    }
}
