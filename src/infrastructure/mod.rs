//! Infrastructure layer - engine, rulesets and guidance stores

pub mod guidance;
pub mod logging;
pub mod ruleset;
pub mod workflow;
