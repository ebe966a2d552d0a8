//! File asset repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use docweave_core::{Error, FileAsset, FileAssetRepository, NewFileAsset, Result};

const FILE_ASSET_COLUMNS: &str = "id, original_filename, content_type, size_bytes, storage_key, \
     sha256, extracted_text, created_at, updated_at";

/// PostgreSQL implementation of FileAssetRepository.
#[derive(Clone)]
pub struct PgFileAssetRepository {
    pool: PgPool,
}

impl PgFileAssetRepository {
    /// Create a new PgFileAssetRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn file_asset_from_row(row: &sqlx::postgres::PgRow) -> FileAsset {
    FileAsset {
        id: row.get("id"),
        original_filename: row.get("original_filename"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        storage_key: row.get("storage_key"),
        sha256: row.get("sha256"),
        extracted_text: row.get("extracted_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl FileAssetRepository for PgFileAssetRepository {
    async fn insert(&self, asset: NewFileAsset) -> Result<FileAsset> {
        let row = sqlx::query(&format!(
            "INSERT INTO file_asset
               (id, document_id, original_filename, content_type, size_bytes,
                storage_key, sha256, extracted_text, created_at, updated_at)
             VALUES ($1, NULL, $2, $3, $4, $5, $6, $7, now(), now())
             RETURNING {}",
            FILE_ASSET_COLUMNS
        ))
        .bind(asset.id)
        .bind(&asset.original_filename)
        .bind(&asset.content_type)
        .bind(asset.size_bytes)
        .bind(&asset.storage_key)
        .bind(&asset.sha256)
        .bind(asset.extracted_text.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(file_asset_from_row(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<FileAsset> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM file_asset WHERE id = $1",
            FILE_ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File asset {}", id)))?;

        Ok(file_asset_from_row(&row))
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<FileAsset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {} FROM file_asset WHERE id = ANY($1) ORDER BY created_at, id",
            FILE_ASSET_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(file_asset_from_row).collect())
    }

    async fn owner_of(&self, id: Uuid) -> Result<Option<Uuid>> {
        let owner: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT document_id FROM file_asset WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        owner.ok_or_else(|| Error::NotFound(format!("File asset {}", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM file_asset WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("File asset {}", id)));
        }
        Ok(())
    }
}
