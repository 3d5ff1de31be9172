//! Guidance domain module
//!
//! Guidance is contextual help attached to a workflow step, resolved from an
//! external document store either by exact document title or by a free-text
//! lookup. Absence of guidance never blocks a session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// A document exposed by a guidance store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidanceDocument {
    /// Citation identifier
    pub uri: String,
    pub title: String,
    pub content: String,
}

impl GuidanceDocument {
    pub fn new(
        uri: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Help text and citations resolved for a step
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guidance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub citations: Vec<String>,
}

impl Guidance {
    pub fn new(help: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            help: Some(help.into()),
            citations,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.help.is_none() && self.citations.is_empty()
    }
}

/// Document store consulted for step guidance
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GuidanceProvider: Send + Sync {
    /// Provider type identifier for logging
    fn provider_type(&self) -> &'static str;

    /// Documents whose title exactly matches one of `titles`
    async fn lookup_by_titles(
        &self,
        titles: &[String],
    ) -> Result<Vec<GuidanceDocument>, DomainError>;

    /// Documents relevant to `query`, best match first
    async fn semantic_lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GuidanceDocument>, DomainError>;
}
