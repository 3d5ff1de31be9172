//! Workflow document loading
//!
//! Documents are read once at startup. YAML is the default format; files
//! ending in `.json` are parsed as JSON.

use std::path::Path;

use tracing::{error, info};

use crate::domain::workflow::{RulesetRegistry, Workflow, WorkflowError};

/// Document formats accepted by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Loads and validates workflow definitions
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowLoader;

impl WorkflowLoader {
    /// Read, parse and validate the document at `path`
    ///
    /// A document without an `id` takes the file stem as its id.
    pub fn load(
        path: impl AsRef<Path>,
        rulesets: &RulesetRegistry,
    ) -> Result<Workflow, WorkflowError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::load(&shown, e.to_string()))?;

        let default_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let workflow = Self::parse(
            &content,
            DocumentFormat::from_path(path),
            default_id,
            rulesets,
        )
        .map_err(|e| match e {
            WorkflowError::Load { message, .. } => WorkflowError::load(&shown, message),
            other => other,
        })
        .inspect_err(|e| error!(path = %shown, error = %e, "Failed to load workflow"))?;

        info!(
            path = %shown,
            workflow_id = %workflow.id(),
            version = %workflow.version(),
            steps = workflow.steps().len(),
            "Workflow loaded"
        );

        Ok(workflow)
    }

    /// Parse and validate a document held in memory
    pub fn parse(
        content: &str,
        format: DocumentFormat,
        default_id: &str,
        rulesets: &RulesetRegistry,
    ) -> Result<Workflow, WorkflowError> {
        let mut workflow: Workflow = match format {
            DocumentFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| WorkflowError::load("<memory>", e.to_string()))?,
            DocumentFormat::Json => serde_json::from_str(content)
                .map_err(|e| WorkflowError::load("<memory>", e.to_string()))?,
        };

        workflow.set_default_id(default_id);
        workflow.validate(rulesets)?;

        Ok(workflow)
    }
}
