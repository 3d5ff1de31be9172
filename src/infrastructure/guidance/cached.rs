use async_trait::async_trait;
use moka::future::Cache;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::guidance::{GuidanceDocument, GuidanceProvider};
use crate::domain::DomainError;

/// Guidance provider wrapper that caches successful lookups with a TTL
pub struct CachedGuidanceProvider {
    inner: Arc<dyn GuidanceProvider>,
    cache: Cache<String, Arc<Vec<GuidanceDocument>>>,
}

impl fmt::Debug for CachedGuidanceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedGuidanceProvider")
            .field("inner", &self.inner.provider_type())
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl CachedGuidanceProvider {
    pub fn new(inner: Arc<dyn GuidanceProvider>, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, 1000)
    }

    pub fn with_capacity(inner: Arc<dyn GuidanceProvider>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build();

        Self { inner, cache }
    }

    async fn cached<F>(&self, key: String, fetch: F) -> Result<Vec<GuidanceDocument>, DomainError>
    where
        F: std::future::Future<Output = Result<Vec<GuidanceDocument>, DomainError>>,
    {
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(
                provider = self.inner.provider_type(),
                key = %key,
                "Cache hit for guidance lookup"
            );
            return Ok((*hit).clone());
        }

        tracing::debug!(
            provider = self.inner.provider_type(),
            key = %key,
            "Cache miss, querying guidance provider"
        );

        // Failures are not cached so the next turn retries the store
        let documents = fetch.await?;
        self.cache.insert(key, Arc::new(documents.clone())).await;

        Ok(documents)
    }
}

#[async_trait]
impl GuidanceProvider for CachedGuidanceProvider {
    fn provider_type(&self) -> &'static str {
        self.inner.provider_type()
    }

    async fn lookup_by_titles(
        &self,
        titles: &[String],
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        let key = format!("titles:{}", titles.join("\u{1f}"));
        self.cached(key, self.inner.lookup_by_titles(titles)).await
    }

    async fn semantic_lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        let key = format!("query:{}:{}", limit, query);
        self.cached(key, self.inner.semantic_lookup(query, limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::guidance::MockGuidanceProvider;

    fn doc() -> GuidanceDocument {
        GuidanceDocument::new("kb://iata", "IATA", "Class 9")
    }

    #[tokio::test]
    async fn test_title_lookup_is_cached() {
        let mut inner = MockGuidanceProvider::new();
        inner.expect_provider_type().return_const("mock");
        inner
            .expect_lookup_by_titles()
            .times(1)
            .returning(|_| Ok(vec![doc()]));

        let provider = CachedGuidanceProvider::new(Arc::new(inner), Duration::from_secs(60));
        let titles = vec!["IATA".to_string()];

        let first = provider.lookup_by_titles(&titles).await.unwrap();
        let second = provider.lookup_by_titles(&titles).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second[0].uri, "kb://iata");
    }

    #[tokio::test]
    async fn test_query_cache_keyed_by_limit() {
        let mut inner = MockGuidanceProvider::new();
        inner.expect_provider_type().return_const("mock");
        inner
            .expect_semantic_lookup()
            .times(2)
            .returning(|_, _| Ok(vec![doc()]));

        let provider = CachedGuidanceProvider::new(Arc::new(inner), Duration::from_secs(60));

        provider.semantic_lookup("batteries", 1).await.unwrap();
        provider.semantic_lookup("batteries", 1).await.unwrap();
        provider.semantic_lookup("batteries", 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mut inner = MockGuidanceProvider::new();
        inner.expect_provider_type().return_const("mock");
        inner
            .expect_semantic_lookup()
            .times(2)
            .returning(|_, _| Err(DomainError::storage("down")));

        let provider = CachedGuidanceProvider::new(Arc::new(inner), Duration::from_secs(60));

        assert!(provider.semantic_lookup("batteries", 1).await.is_err());
        assert!(provider.semantic_lookup("batteries", 1).await.is_err());
    }
}
