//! Guided Workflow API
//!
//! A declarative question/answer workflow interpreter with support for:
//! - Workflows authored as YAML or JSON documents, validated at load time
//! - Conditional requiredness, derived answers and advisory early exits
//! - Named ruleset computations registered by the host
//! - Step guidance from an in-memory or PostgreSQL document store

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use api::state::AppState;
use config::GuidanceConfig;
use domain::guidance::GuidanceProvider;
use domain::workflow::{RulesetRegistry, Workflow};
use infrastructure::guidance::{create_guidance_provider, GuidanceResolver, GuidanceResolverConfig};
use infrastructure::ruleset::register_builtin_rulesets;
use infrastructure::workflow::{WorkflowEngineImpl, WorkflowLoader};

/// Registry holding every built-in ruleset
pub fn build_ruleset_registry() -> anyhow::Result<RulesetRegistry> {
    let mut registry = RulesetRegistry::new();
    register_builtin_rulesets(&mut registry)?;
    Ok(registry)
}

/// Load and validate the workflow document at `path` against the built-in rulesets
pub fn load_workflow(path: &str, rulesets: &RulesetRegistry) -> anyhow::Result<Workflow> {
    WorkflowLoader::load(path, rulesets)
        .with_context(|| format!("Failed to load workflow '{}'", path))
}

/// Build an engine whose guidance lookups follow the configured bounds
pub fn create_engine(
    config: &GuidanceConfig,
    provider: Arc<dyn GuidanceProvider>,
    rulesets: Arc<RulesetRegistry>,
) -> WorkflowEngineImpl {
    let resolver = GuidanceResolver::with_config(
        provider,
        GuidanceResolverConfig {
            timeout: Duration::from_millis(config.timeout_ms),
            max_help_chars: config.max_help_chars,
        },
    );

    WorkflowEngineImpl::new(resolver, rulesets)
}

/// Create the application state: workflow, rulesets, guidance and engine
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let rulesets = Arc::new(build_ruleset_registry()?);
    info!(rulesets = ?rulesets.names(), "Rulesets registered");

    let workflow = Arc::new(load_workflow(&config.workflow.path, &rulesets)?);

    let guidance = create_guidance_provider(&config.guidance)
        .await
        .context("Failed to initialize guidance provider")?;

    let engine = create_engine(&config.guidance, guidance.clone(), rulesets);

    Ok(AppState::new(workflow, Arc::new(engine), guidance))
}
