//! Document repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use docweave_core::{
    new_v7, CreateDocumentRequest, Document, DocumentRepository, Error, ListDocumentsRequest,
    ListDocumentsResponse, Result, UpdateDocumentRequest,
};

use crate::escape_like;

/// PostgreSQL implementation of DocumentRepository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attachment_ids(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM file_asset WHERE document_id = $1 ORDER BY created_at, id",
        )
        .bind(document_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids)
    }

    async fn fetch_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Document> {
        let row = sqlx::query(
            "SELECT id, title, content, version, created_at, updated_at
             FROM document WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Document {}", id)))?;

        let attachment_ids = Self::attachment_ids(tx, id).await?;
        Ok(document_from_row(&row, attachment_ids))
    }
}

fn document_from_row(row: &sqlx::postgres::PgRow, attachment_ids: Vec<Uuid>) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        attachment_ids,
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Document> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".to_string()));
        }
        let row = sqlx::query(
            "INSERT INTO document (id, title, content, version, created_at, updated_at)
             VALUES ($1, $2, $3, 0, now(), now())
             RETURNING id, title, content, version, created_at, updated_at",
        )
        .bind(new_v7())
        .bind(req.title.trim())
        .bind(&req.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(document_from_row(&row, Vec::new()))
    }

    async fn fetch(&self, id: Uuid) -> Result<Document> {
        let mut tx = self.pool.begin().await?;
        let doc = Self::fetch_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let pattern = req.needle().map(|q| format!("%{}%", escape_like(q)));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM document
             WHERE $1::TEXT IS NULL OR title ILIKE $1 OR content ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT d.id, d.title, d.content, d.version, d.created_at, d.updated_at,
                    COALESCE(
                        ARRAY(SELECT f.id FROM file_asset f
                              WHERE f.document_id = d.id ORDER BY f.created_at, f.id),
                        '{}'
                    ) AS attachment_ids
             FROM document d
             WHERE $1::TEXT IS NULL OR d.title ILIKE $1 OR d.content ILIKE $1
             ORDER BY d.updated_at DESC, d.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(pattern.as_deref())
        .bind(req.effective_limit())
        .bind(req.effective_offset())
        .fetch_all(&self.pool)
        .await?;

        let documents = rows
            .iter()
            .map(|row| {
                let ids: Vec<Uuid> = row.get("attachment_ids");
                document_from_row(row, ids)
            })
            .collect();

        Ok(ListDocumentsResponse { documents, total })
    }

    async fn update(&self, id: Uuid, req: UpdateDocumentRequest) -> Result<Document> {
        if let Some(title) = req.title.as_deref() {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Title must not be empty".to_string()));
            }
        }

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE document
             SET title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.content.as_deref())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Document {}", id)));
        }
        let doc = Self::fetch_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn save_attachments(&self, doc: &Document) -> Result<Document> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            "UPDATE document SET version = version + 1, updated_at = now()
             WHERE id = $1 AND version = $2",
        )
        .bind(doc.id)
        .bind(doc.version)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
                    .bind(doc.id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                Error::Conflict(format!(
                    "Document {} changed since version {}",
                    doc.id, doc.version
                ))
            } else {
                Error::NotFound(format!("Document {}", doc.id))
            });
        }

        // Claim listed assets that are unowned; never take one from another document.
        sqlx::query(
            "UPDATE file_asset SET document_id = $1, updated_at = now()
             WHERE id = ANY($2) AND document_id IS NULL",
        )
        .bind(doc.id)
        .bind(&doc.attachment_ids)
        .execute(&mut *tx)
        .await?;

        // Orphan removal: owned rows no longer listed are deleted.
        sqlx::query("DELETE FROM file_asset WHERE document_id = $1 AND NOT (id = ANY($2))")
            .bind(doc.id)
            .bind(&doc.attachment_ids)
            .execute(&mut *tx)
            .await?;

        let saved = Self::fetch_tx(&mut tx, doc.id).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // file_asset rows go with the document (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM document WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Document {}", id)));
        }
        Ok(())
    }
}
