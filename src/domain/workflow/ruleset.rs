//! Ruleset plugins
//!
//! A ruleset is a named, pure computation that a step invokes through a
//! `compute` directive to classify the current answers. The host registers
//! every ruleset before any workflow is loaded; the loader rejects workflows
//! referencing names that are not registered.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::error::WorkflowError;

/// Named inputs handed to a ruleset
pub type RulesetInputs = BTreeMap<String, Value>;

/// A pure classification function over answers
///
/// Implementations must be deterministic: the same inputs always produce the
/// same output.
pub trait Ruleset: Send + Sync + fmt::Debug {
    /// Name referenced by `compute[].using`
    fn name(&self) -> &str;

    /// Compute the classification
    fn compute(&self, inputs: &RulesetInputs) -> Result<Value, WorkflowError>;
}

type RulesetFn = dyn Fn(&RulesetInputs) -> Result<Value, WorkflowError> + Send + Sync;

/// Ruleset backed by a closure
pub struct FnRuleset {
    name: String,
    func: Arc<RulesetFn>,
}

impl FnRuleset {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&RulesetInputs) -> Result<Value, WorkflowError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FnRuleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRuleset").field("name", &self.name).finish()
    }
}

impl Ruleset for FnRuleset {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, inputs: &RulesetInputs) -> Result<Value, WorkflowError> {
        (self.func)(inputs)
    }
}

/// Registry of rulesets, keyed by name
#[derive(Debug, Clone, Default)]
pub struct RulesetRegistry {
    rulesets: HashMap<String, Arc<dyn Ruleset>>,
}

impl RulesetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ruleset under its own name
    pub fn register(&mut self, ruleset: Arc<dyn Ruleset>) -> Result<(), WorkflowError> {
        let name = ruleset.name().to_string();

        if self.rulesets.contains_key(&name) {
            return Err(WorkflowError::duplicate_ruleset(name));
        }

        debug!(ruleset = %name, "Registering ruleset");
        self.rulesets.insert(name, ruleset);
        Ok(())
    }

    /// Register a closure as a ruleset
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F) -> Result<(), WorkflowError>
    where
        F: Fn(&RulesetInputs) -> Result<Value, WorkflowError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnRuleset::new(name, func)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rulesets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Ruleset>> {
        self.rulesets.get(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rulesets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }

    /// Run a ruleset by name
    pub fn run(&self, name: &str, inputs: &RulesetInputs) -> Result<Value, WorkflowError> {
        let ruleset = self
            .get(name)
            .ok_or_else(|| WorkflowError::unknown_ruleset(name))?;

        ruleset.compute(inputs)
    }
}
