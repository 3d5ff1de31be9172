//! In-memory guidance provider for development and testing

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::guidance::{GuidanceDocument, GuidanceProvider};
use crate::domain::DomainError;

/// In-memory guidance store, optionally seeded from a YAML or JSON document list
#[derive(Debug, Default)]
pub struct InMemoryGuidanceProvider {
    documents: RwLock<Vec<GuidanceDocument>>,
}

impl InMemoryGuidanceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<GuidanceDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Load a list of `{uri, title, content}` documents
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read guidance documents '{}': {}",
                path.display(),
                e
            ))
        })?;

        let documents: Vec<GuidanceDocument> = serde_yaml::from_str(&content).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to parse guidance documents '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(
            path = %path.display(),
            count = documents.len(),
            "Loaded guidance documents"
        );

        Ok(Self::with_documents(documents))
    }

    pub async fn add_document(&self, document: GuidanceDocument) {
        self.documents.write().await.push(document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Term-overlap score; title matches count double
fn score(document: &GuidanceDocument, query_terms: &HashSet<String>) -> usize {
    let title_terms = terms(&document.title);
    let content_terms = terms(&document.content);

    query_terms
        .iter()
        .map(|term| {
            let mut s = 0;
            if title_terms.contains(term) {
                s += 2;
            }
            if content_terms.contains(term) {
                s += 1;
            }
            s
        })
        .sum()
}

#[async_trait]
impl GuidanceProvider for InMemoryGuidanceProvider {
    fn provider_type(&self) -> &'static str {
        "in_memory"
    }

    async fn lookup_by_titles(
        &self,
        titles: &[String],
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        let documents = self.documents.read().await;

        Ok(documents
            .iter()
            .filter(|d| titles.contains(&d.title))
            .cloned()
            .collect())
    }

    async fn semantic_lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        let documents = self.documents.read().await;
        let query_terms = terms(query);

        let mut scored: Vec<(usize, &GuidanceDocument)> = documents
            .iter()
            .map(|d| (score(d, &query_terms), d))
            .filter(|(s, _)| *s > 0)
            .collect();

        // Stable sort keeps store order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, d)| d.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> InMemoryGuidanceProvider {
        InMemoryGuidanceProvider::with_documents(vec![
            GuidanceDocument::new(
                "kb://iata-lithium",
                "IATA Lithium Battery Guidance",
                "Lithium ion batteries shipped by air fall under PI965 to PI967.",
            ),
            GuidanceDocument::new(
                "kb://my-export-permits",
                "Malaysia Export Permits",
                "Strategic goods require an export permit from MITI.",
            ),
            GuidanceDocument::new(
                "kb://hk-import",
                "Hong Kong Import Rules",
                "Batteries imported into Hong Kong need a shipper declaration.",
            ),
        ])
    }

    #[tokio::test]
    async fn test_lookup_by_titles_exact_match() {
        let provider = provider();

        let found = provider
            .lookup_by_titles(&[
                "Hong Kong Import Rules".to_string(),
                "IATA Lithium Battery Guidance".to_string(),
                "Unknown".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].uri, "kb://iata-lithium");
        assert_eq!(found[1].uri, "kb://hk-import");

        let none = provider
            .lookup_by_titles(&["iata lithium battery guidance".to_string()])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_lookup_ranks_by_overlap() {
        let provider = provider();

        let found = provider
            .semantic_lookup("export permit for Malaysia", 2)
            .await
            .unwrap();

        assert!(!found.is_empty());
        assert_eq!(found[0].uri, "kb://my-export-permits");
        assert!(found.len() <= 2);
    }

    #[tokio::test]
    async fn test_semantic_lookup_no_match() {
        let provider = provider();

        let found = provider.semantic_lookup("zzz qqq", 5).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_add_document() {
        let provider = InMemoryGuidanceProvider::new();
        assert!(provider.is_empty().await);

        provider
            .add_document(GuidanceDocument::new("kb://a", "A", "Alpha content"))
            .await;

        assert_eq!(provider.len().await, 1);
        let found = provider.semantic_lookup("alpha", 1).await.unwrap();
        assert_eq!(found[0].uri, "kb://a");
    }

    #[test]
    fn test_from_file_missing() {
        let err = InMemoryGuidanceProvider::from_file("does/not/exist.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read guidance documents"));
    }
}
