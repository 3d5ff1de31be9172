//! Workflow domain module
//!
//! A declarative question/answer interpreter. Workflows are authored as
//! documents and drive a session toward a terminal outcome:
//! - Ordered steps with typed questions, optionally conditionally required
//! - Derived answers copied from ruleset results
//! - Named ruleset computations
//! - Conditional transitions and early-termination advisory rules
//!
//! ## Conditions
//!
//! Conditions compare answers against bare literals:
//! - `transport_mode==air` - string equality
//! - `has_permit!=yes` - inequality
//! - `permit==null` - absence test
//! - `a==1 && (b==x || c==y)` - combination
//! - `always` - unconditional transition

mod engine;
mod entity;
mod error;
pub mod expression;
mod ruleset;
mod state;
mod summary;

pub use engine::{AdvanceOutcome, SessionStatus, UiDescriptor, WorkflowEngine};
pub use entity::{
    AdvisoryRule, AnswerPattern, ComputeDirective, Question, QuestionType, Step, TransitionRule,
    Workflow, DONE_STEP_ID,
};
pub use error::WorkflowError;
pub use expression::{Condition, ExpressionError};
pub use ruleset::{FnRuleset, Ruleset, RulesetInputs, RulesetRegistry};
pub use state::{is_answered, resolve_path, Answers, Computed, HistoryEntry, State};
pub use summary::{summarize, QuestionSummary, StepStatus, StepSummary, WorkflowSummary};
