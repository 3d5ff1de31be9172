//! Resolves step guidance from a document store
//!
//! Resolution order:
//! 1. `guidance_ref` titles, concatenating every matching document
//! 2. `guidance_query`, taking only the best match
//!
//! Lookups are bounded by a timeout. Errors and timeouts are logged and
//! treated as "no guidance"; they never fail the turn.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::guidance::{Guidance, GuidanceDocument, GuidanceProvider};
use crate::domain::workflow::Step;
use crate::domain::DomainError;

/// Default maximum length of the help snippet, in characters
pub const DEFAULT_MAX_HELP_CHARS: usize = 400;

/// Default bound for a single lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(3000);

const ELLIPSIS: char = '…';

#[derive(Debug, Clone)]
pub struct GuidanceResolverConfig {
    pub timeout: Duration,
    pub max_help_chars: usize,
}

impl Default for GuidanceResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            max_help_chars: DEFAULT_MAX_HELP_CHARS,
        }
    }
}

/// Guidance resolver over any [`GuidanceProvider`]
#[derive(Clone)]
pub struct GuidanceResolver {
    provider: Arc<dyn GuidanceProvider>,
    config: GuidanceResolverConfig,
}

impl fmt::Debug for GuidanceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidanceResolver")
            .field("provider", &self.provider.provider_type())
            .field("config", &self.config)
            .finish()
    }
}

impl GuidanceResolver {
    pub fn new(provider: Arc<dyn GuidanceProvider>) -> Self {
        Self::with_config(provider, GuidanceResolverConfig::default())
    }

    pub fn with_config(provider: Arc<dyn GuidanceProvider>, config: GuidanceResolverConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_type(&self) -> &'static str {
        self.provider.provider_type()
    }

    /// Resolve help text and citations for a step
    pub async fn resolve(&self, step: &Step) -> Guidance {
        if !step.guidance_ref.is_empty() {
            let documents = self
                .bounded(
                    "lookup_by_titles",
                    &step.id,
                    self.provider.lookup_by_titles(&step.guidance_ref),
                )
                .await;

            if !documents.is_empty() {
                let content = documents
                    .iter()
                    .map(|d| d.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let citations = documents.into_iter().map(|d| d.uri).collect();

                return self.guidance(&content, citations);
            }
        }

        if let Some(query) = &step.guidance_query {
            let documents = self
                .bounded(
                    "semantic_lookup",
                    &step.id,
                    self.provider.semantic_lookup(query, 1),
                )
                .await;

            if let Some(top) = documents.into_iter().next() {
                return self.guidance(&top.content, vec![top.uri]);
            }
        }

        Guidance::none()
    }

    fn guidance(&self, content: &str, citations: Vec<String>) -> Guidance {
        let help = trim_snippet(content, self.config.max_help_chars);

        Guidance {
            help: (!help.is_empty()).then_some(help),
            citations,
        }
    }

    async fn bounded<F>(&self, operation: &'static str, step_id: &str, lookup: F) -> Vec<GuidanceDocument>
    where
        F: Future<Output = Result<Vec<GuidanceDocument>, DomainError>>,
    {
        match tokio::time::timeout(self.config.timeout, lookup).await {
            Ok(Ok(documents)) => {
                debug!(
                    provider = self.provider.provider_type(),
                    operation,
                    step_id,
                    found = documents.len(),
                    "Guidance lookup completed"
                );
                documents
            }
            Ok(Err(e)) => {
                warn!(
                    provider = self.provider.provider_type(),
                    operation,
                    step_id,
                    error = %e,
                    "Guidance lookup failed, continuing without guidance"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    provider = self.provider.provider_type(),
                    operation,
                    step_id,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Guidance lookup timed out, continuing without guidance"
                );
                Vec::new()
            }
        }
    }
}

/// Collapse whitespace and cut to `max_chars`, ending in an ellipsis when cut
pub fn trim_snippet(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if max_chars == 0 || collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut truncated: String = collapsed.chars().take(max_chars - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::guidance::MockGuidanceProvider;
    use async_trait::async_trait;

    fn doc(uri: &str, title: &str, content: &str) -> GuidanceDocument {
        GuidanceDocument::new(uri, title, content)
    }

    #[test]
    fn test_trim_snippet_collapses_whitespace() {
        assert_eq!(trim_snippet("  a\n\n b\t c  ", 400), "a b c");
    }

    #[test]
    fn test_trim_snippet_truncates() {
        let text = "x".repeat(450);
        let trimmed = trim_snippet(&text, 400);

        assert_eq!(trimmed.chars().count(), 400);
        assert!(trimmed.ends_with('…'));
        assert_eq!(trim_snippet(&"y".repeat(400), 400).chars().count(), 400);
        assert!(!trim_snippet(&"y".repeat(400), 400).ends_with('…'));
    }

    #[tokio::test]
    async fn test_resolve_by_titles_concatenates_documents() {
        let mut provider = MockGuidanceProvider::new();
        provider.expect_provider_type().return_const("mock");
        provider
            .expect_lookup_by_titles()
            .withf(|titles| titles.len() == 2 && titles[0] == "IATA" && titles[1] == "Customs")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    doc("kb://iata", "IATA", "Lithium batteries\n are Class 9."),
                    doc("kb://customs", "Customs", "Declare at export."),
                ])
            });
        provider.expect_semantic_lookup().never();

        let resolver = GuidanceResolver::new(Arc::new(provider));
        let step = Step::new("s", "S")
            .with_guidance_ref("IATA")
            .with_guidance_ref("Customs")
            .with_guidance_query("unused");

        let guidance = resolver.resolve(&step).await;

        assert_eq!(
            guidance.help.as_deref(),
            Some("Lithium batteries are Class 9. Declare at export.")
        );
        assert_eq!(guidance.citations, vec!["kb://iata", "kb://customs"]);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_query_top_result() {
        let mut provider = MockGuidanceProvider::new();
        provider.expect_provider_type().return_const("mock");
        provider.expect_lookup_by_titles().returning(|_| Ok(vec![]));
        provider
            .expect_semantic_lookup()
            .withf(|query, limit| query.to_string() == "battery packing" && *limit == 1)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    doc("kb://best", "Best", "Pack batteries in strong outer packaging."),
                    doc("kb://second", "Second", "Ignored"),
                ])
            });

        let resolver = GuidanceResolver::new(Arc::new(provider));
        let step = Step::new("s", "S")
            .with_guidance_ref("Missing title")
            .with_guidance_query("battery packing");

        let guidance = resolver.resolve(&step).await;

        assert_eq!(
            guidance.help.as_deref(),
            Some("Pack batteries in strong outer packaging.")
        );
        assert_eq!(guidance.citations, vec!["kb://best"]);
    }

    #[tokio::test]
    async fn test_resolve_without_references() {
        let mut provider = MockGuidanceProvider::new();
        provider.expect_lookup_by_titles().never();
        provider.expect_semantic_lookup().never();

        let resolver = GuidanceResolver::new(Arc::new(provider));
        let guidance = resolver.resolve(&Step::new("s", "S")).await;

        assert!(guidance.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_no_guidance() {
        let mut provider = MockGuidanceProvider::new();
        provider.expect_provider_type().return_const("mock");
        provider
            .expect_lookup_by_titles()
            .returning(|_| Err(DomainError::storage("connection refused")));
        provider
            .expect_semantic_lookup()
            .returning(|_, _| Err(DomainError::storage("connection refused")));

        let resolver = GuidanceResolver::new(Arc::new(provider));
        let step = Step::new("s", "S")
            .with_guidance_ref("IATA")
            .with_guidance_query("batteries");

        let guidance = resolver.resolve(&step).await;

        assert!(guidance.help.is_none());
        assert!(guidance.citations.is_empty());
    }

    struct SlowProvider;

    #[async_trait]
    impl GuidanceProvider for SlowProvider {
        fn provider_type(&self) -> &'static str {
            "slow"
        }

        async fn lookup_by_titles(
            &self,
            _titles: &[String],
        ) -> Result<Vec<GuidanceDocument>, DomainError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![doc("kb://late", "Late", "Too late")])
        }

        async fn semantic_lookup(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<GuidanceDocument>, DomainError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![doc("kb://late", "Late", "Too late")])
        }
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_no_guidance() {
        let resolver = GuidanceResolver::with_config(
            Arc::new(SlowProvider),
            GuidanceResolverConfig {
                timeout: Duration::from_millis(20),
                max_help_chars: DEFAULT_MAX_HELP_CHARS,
            },
        );
        let step = Step::new("s", "S")
            .with_guidance_ref("IATA")
            .with_guidance_query("batteries");

        let guidance = resolver.resolve(&step).await;

        assert!(guidance.is_empty());
    }
}
