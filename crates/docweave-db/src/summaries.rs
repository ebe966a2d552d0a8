//! Summary repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use docweave_core::{new_v7, NewSummary, Result, Summary, SummaryRepository};

/// PostgreSQL implementation of SummaryRepository.
#[derive(Clone)]
pub struct PgSummaryRepository {
    pool: PgPool,
}

impl PgSummaryRepository {
    /// Create a new PgSummaryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn summary_from_row(row: &sqlx::postgres::PgRow) -> Summary {
    Summary {
        id: row.get("id"),
        file_asset_id: row.get("file_asset_id"),
        summary_text: row.get("summary_text"),
        model_name: row.get("model_name"),
        style: row.get("style"),
        latency_ms: row.get("latency_ms"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl SummaryRepository for PgSummaryRepository {
    async fn insert(&self, summary: NewSummary) -> Result<Summary> {
        let row = sqlx::query(
            "INSERT INTO summary
               (id, file_asset_id, summary_text, model_name, style, latency_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             RETURNING id, file_asset_id, summary_text, model_name, style, latency_ms, created_at",
        )
        .bind(new_v7())
        .bind(summary.file_asset_id)
        .bind(&summary.summary_text)
        .bind(&summary.model_name)
        .bind(&summary.style)
        .bind(summary.latency_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary_from_row(&row))
    }

    async fn list_for_file(&self, file_asset_id: Uuid) -> Result<Vec<Summary>> {
        let rows = sqlx::query(
            "SELECT id, file_asset_id, summary_text, model_name, style, latency_ms, created_at
             FROM summary WHERE file_asset_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(file_asset_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn latest_for_file(&self, file_asset_id: Uuid) -> Result<Option<Summary>> {
        let row = sqlx::query(
            "SELECT id, file_asset_id, summary_text, model_name, style, latency_ms, created_at
             FROM summary WHERE file_asset_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(file_asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(summary_from_row))
    }

    async fn delete_for_file(&self, file_asset_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM summary WHERE file_asset_id = $1")
            .bind(file_asset_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
