use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::{CachedGuidanceProvider, InMemoryGuidanceProvider, PostgresGuidanceProvider};
use crate::config::{GuidanceConfig, GuidanceProviderKind};
use crate::domain::guidance::GuidanceProvider;
use crate::domain::DomainError;

/// Create the configured guidance provider, wrapped in a cache when enabled
pub async fn create_guidance_provider(
    config: &GuidanceConfig,
) -> Result<Arc<dyn GuidanceProvider>, DomainError> {
    let provider: Arc<dyn GuidanceProvider> = match config.provider {
        GuidanceProviderKind::Memory => match &config.documents_path {
            Some(path) => Arc::new(InMemoryGuidanceProvider::from_file(path)?),
            None => Arc::new(InMemoryGuidanceProvider::new()),
        },
        GuidanceProviderKind::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                DomainError::configuration("guidance.database_url is required for postgres")
            })?;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to connect to guidance database: {}", e))
                })?;

            Arc::new(PostgresGuidanceProvider::new(pool).with_table_name(&config.table_name))
        }
    };

    info!(
        provider = provider.provider_type(),
        cache_enabled = config.cache_enabled,
        "Guidance provider initialized"
    );

    if !config.cache_enabled {
        return Ok(provider);
    }

    Ok(Arc::new(CachedGuidanceProvider::with_capacity(
        provider,
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_max_capacity,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_without_documents() {
        let config = GuidanceConfig {
            cache_enabled: false,
            ..Default::default()
        };

        let provider = create_guidance_provider(&config).await.unwrap();
        assert_eq!(provider.provider_type(), "in_memory");
        assert!(provider.semantic_lookup("anything", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cached_provider_keeps_inner_type() {
        let provider = create_guidance_provider(&GuidanceConfig::default())
            .await
            .unwrap();
        assert_eq!(provider.provider_type(), "in_memory");
    }

    #[tokio::test]
    async fn test_postgres_requires_database_url() {
        let config = GuidanceConfig {
            provider: GuidanceProviderKind::Postgres,
            ..Default::default()
        };

        let Err(err) = create_guidance_provider(&config).await else {
            panic!("postgres provider without a database url should fail");
        };
        assert!(err.to_string().contains("database_url"));
    }
}
