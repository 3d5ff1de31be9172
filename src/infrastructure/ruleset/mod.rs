//! Built-in ruleset plugins

mod li_ion_air;

use std::sync::Arc;

use crate::domain::workflow::{RulesetRegistry, WorkflowError};

pub use li_ion_air::{DgProfile, LiIonAirRuleset, LI_ION_AIR_V1};

/// Register every built-in ruleset
pub fn register_builtin_rulesets(registry: &mut RulesetRegistry) -> Result<(), WorkflowError> {
    registry.register(Arc::new(LiIonAirRuleset::new()))?;
    Ok(())
}
