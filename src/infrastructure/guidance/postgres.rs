//! PostgreSQL guidance provider
//!
//! Reads from a `documents(uri, title, content)` table. Title lookups are
//! exact; free-text lookups use PostgreSQL full-text search ranked by
//! `ts_rank`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::guidance::{GuidanceDocument, GuidanceProvider};
use crate::domain::DomainError;

const PROVIDER: &str = "postgres";

#[derive(Debug, Clone)]
pub struct PostgresGuidanceProvider {
    pool: PgPool,
    table_name: String,
}

impl PostgresGuidanceProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "documents".to_string(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    fn titles_query(&self) -> String {
        format!(
            "SELECT uri, title, content FROM {} WHERE title = ANY($1)",
            self.table_name
        )
    }

    fn search_query(&self) -> String {
        format!(
            r#"
            SELECT uri, title, content
            FROM {table}
            WHERE to_tsvector('english', title || ' ' || content) @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank(
                to_tsvector('english', title || ' ' || content),
                plainto_tsquery('english', $1)
            ) DESC
            LIMIT $2
            "#,
            table = self.table_name
        )
    }

    fn row_to_document(row: &PgRow) -> Result<GuidanceDocument, DomainError> {
        let field = |name: &str| -> Result<String, DomainError> {
            row.try_get::<String, _>(name)
                .map_err(|e| DomainError::provider(PROVIDER, format!("Invalid row: {}", e)))
        };

        Ok(GuidanceDocument {
            uri: field("uri")?,
            title: field("title")?,
            content: field("content")?,
        })
    }
}

#[async_trait]
impl GuidanceProvider for PostgresGuidanceProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup_by_titles(
        &self,
        titles: &[String],
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&self.titles_query())
            .bind(titles.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Guidance title lookup failed");
                DomainError::provider(PROVIDER, format!("Title lookup failed: {}", e))
            })?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn semantic_lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GuidanceDocument>, DomainError> {
        let rows = sqlx::query(&self.search_query())
            .bind(query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, query, "Guidance search failed");
                DomainError::provider(PROVIDER, format!("Search failed: {}", e))
            })?;

        rows.iter().map(Self::row_to_document).collect()
    }
}
