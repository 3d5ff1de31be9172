//! Per-session workflow state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::DONE_STEP_ID;

/// Answers collected so far, keyed by question id
pub type Answers = BTreeMap<String, Value>;

/// Ruleset results, keyed by compute directive output
pub type Computed = BTreeMap<String, Value>;

/// Snapshot recorded when a step is left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: String,
    pub answers: Answers,
    pub computed: Computed,
}

/// State of a single session
///
/// The host owns this value and hands it back on every turn. The engine only
/// ever works on a copy and returns the updated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(alias = "currentStepId")]
    pub current_step_id: String,

    #[serde(default)]
    pub answers: Answers,

    #[serde(default)]
    pub computed: Computed,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl State {
    /// Create a fresh state positioned at the given step
    pub fn new(first_step_id: impl Into<String>) -> Self {
        Self {
            current_step_id: first_step_id.into(),
            answers: Answers::new(),
            computed: Computed::new(),
            history: Vec::new(),
        }
    }

    /// Whether the session reached the terminal step
    pub fn is_done(&self) -> bool {
        self.current_step_id == DONE_STEP_ID
    }

    /// Whether the question has a usable answer
    pub fn is_answered(&self, question_id: &str) -> bool {
        is_answered(self.answers.get(question_id))
    }

    /// Append an immutable snapshot of the current answers and computations
    pub(crate) fn push_history(&mut self, step: impl Into<String>) {
        self.history.push(HistoryEntry {
            step: step.into(),
            answers: self.answers.clone(),
            computed: self.computed.clone(),
        });
    }
}

/// An answer counts as given unless it is absent, null or the empty string
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Resolve a dotted path (`dg_profile.un`, `items.0.name`) against a map of values
pub fn resolve_path<'a>(root: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = root.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
