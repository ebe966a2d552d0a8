//! Attachment lifecycle across the blob store and the relational store.
//!
//! A document owns its file assets. Adding an attachment writes the blob,
//! extracts text, inserts the row and then claims it through the document's
//! versioned attachment set. Removal deletes the blob best-effort and lets
//! orphan removal drop the row; the row is authoritative, so a lingering
//! blob is logged rather than reported to the caller.
//!
//! Atomicity: the document is checked before any bytes are written. If a
//! later step fails, the blob (and the row, once inserted) are deleted
//! best-effort before the error is returned.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use docweave_core::{
    defaults, new_v7, resolve_content_type, Document, DocumentRepository, Error, FileAsset,
    FileAssetRepository, NewFileAsset, NoopScheduler, Result, StoredBlob, SummaryScheduler,
    TextExtractor,
};

use crate::blob_store::BlobStore;

/// Outcome of deleting a document together with its attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentDeletion {
    /// Attachment rows removed with the document.
    pub attachments: usize,
    /// Blobs actually removed from storage.
    pub blobs_deleted: usize,
    /// Blob deletions that failed and were skipped.
    pub blob_failures: usize,
}

/// Keeps documents, file asset rows and stored blobs consistent.
#[derive(Clone)]
pub struct AttachmentCoordinator {
    documents: Arc<dyn DocumentRepository>,
    file_assets: Arc<dyn FileAssetRepository>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    scheduler: Arc<dyn SummaryScheduler>,
}

/// Keep only the final path component of an uploaded file name.
fn clean_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() {
        "file".to_string()
    } else {
        base.to_string()
    }
}

impl AttachmentCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        file_assets: Arc<dyn FileAssetRepository>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            documents,
            file_assets,
            blobs,
            extractor,
            scheduler: Arc::new(NoopScheduler),
        }
    }

    /// Route extracted text to `scheduler` for background summarization.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn SummaryScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Attach a new file to a document.
    ///
    /// Fails with `NotFound` if the document does not exist (before anything
    /// is stored) and `InvalidInput` for empty content. Text is extracted when
    /// the content type is supported; non-blank text is handed to the
    /// summarization scheduler once the attachment is committed.
    pub async fn add_attachment(
        &self,
        document_id: Uuid,
        data: &[u8],
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<FileAsset> {
        let start = Instant::now();
        let doc = self.documents.fetch(document_id).await?;

        if data.is_empty() {
            return Err(Error::InvalidInput("Uploaded file is empty".to_string()));
        }

        let filename = clean_filename(filename);
        let content_type = resolve_content_type(content_type, data);
        let blob = self.blobs.save_bytes(data, &filename).await?;

        let extracted_text = if self.extractor.is_supported(&content_type) {
            Some(self.extractor.extract_text(data, &filename).await)
        } else {
            debug!(
                subsystem = "db",
                component = "coordinator",
                op = "add_attachment",
                content_type = %content_type,
                "Content type not extractable, skipping text extraction"
            );
            None
        };

        let asset = self
            .insert_row(&blob, filename, content_type, extracted_text)
            .await?;

        let attached = self
            .update_attachments(document_id, Some(doc), |doc| doc.attach(asset.id))
            .await;
        if let Err(e) = attached {
            warn!(
                subsystem = "db",
                component = "coordinator",
                op = "add_attachment",
                document_id = %document_id,
                file_asset_id = %asset.id,
                error = %e,
                "Attaching file failed, removing new row and blob"
            );
            if let Err(del) = self.file_assets.delete(asset.id).await {
                warn!(file_asset_id = %asset.id, error = %del, "Compensating row delete failed");
            }
            self.delete_blob_best_effort(&blob.key).await;
            return Err(e);
        }

        info!(
            subsystem = "db",
            component = "coordinator",
            op = "add_attachment",
            document_id = %document_id,
            file_asset_id = %asset.id,
            size_bytes = asset.size_bytes,
            text_len = asset.extracted_text.as_ref().map(|t| t.chars().count()).unwrap_or(0),
            duration_ms = start.elapsed().as_millis() as u64,
            "Attachment added"
        );

        if let Some(text) = asset.extracted_text.as_ref().filter(|t| !t.trim().is_empty()) {
            self.scheduler.schedule(asset.id, text.clone());
        }

        Ok(asset)
    }

    /// Detach and delete one of a document's attachments.
    ///
    /// `AttachmentMismatch` if the file exists but belongs elsewhere (or to no
    /// document); neither document is touched in that case.
    pub async fn remove_attachment(&self, document_id: Uuid, file_id: Uuid) -> Result<()> {
        let doc = self.documents.fetch(document_id).await?;
        let asset = self.owned_asset(&doc, file_id).await?;

        self.delete_blob_best_effort(&asset.storage_key).await;

        self.update_attachments(document_id, Some(doc), |doc| doc.detach(file_id))
            .await?;

        info!(
            subsystem = "db",
            component = "coordinator",
            op = "remove_attachment",
            document_id = %document_id,
            file_asset_id = %file_id,
            "Attachment removed"
        );
        Ok(())
    }

    /// Delete a document, every attachment row it owns, and their blobs.
    ///
    /// Each blob deletion is attempted independently; failures are logged and
    /// counted but never stop the document delete.
    pub async fn delete_document_with_attachments(
        &self,
        document_id: Uuid,
    ) -> Result<DocumentDeletion> {
        let doc = self.documents.fetch(document_id).await?;
        let assets = self.file_assets.fetch_many(&doc.attachment_ids).await?;

        let outcomes = join_all(assets.iter().map(|asset| async move {
            match self.blobs.delete(&asset.storage_key).await {
                Ok(removed) => Ok(removed),
                Err(e) => {
                    warn!(
                        subsystem = "db",
                        component = "coordinator",
                        op = "delete_document",
                        document_id = %document_id,
                        file_asset_id = %asset.id,
                        error = %e,
                        "Blob delete failed, continuing"
                    );
                    Err(e)
                }
            }
        }))
        .await;

        let blobs_deleted = outcomes.iter().filter(|o| matches!(o, Ok(true))).count();
        let blob_failures = outcomes.iter().filter(|o| o.is_err()).count();

        self.documents.delete(document_id).await?;

        let deletion = DocumentDeletion {
            attachments: assets.len(),
            blobs_deleted,
            blob_failures,
        };
        info!(
            subsystem = "db",
            component = "coordinator",
            op = "delete_document",
            document_id = %document_id,
            attachments = deletion.attachments,
            blobs_deleted = deletion.blobs_deleted,
            blob_failures = deletion.blob_failures,
            "Document deleted with attachments"
        );
        Ok(deletion)
    }

    /// File assets attached to a document.
    pub async fn list_attachments(&self, document_id: Uuid) -> Result<Vec<FileAsset>> {
        let doc = self.documents.fetch(document_id).await?;
        self.attachments_of(&doc).await
    }

    /// File assets of an already loaded document, oldest first.
    pub async fn attachments_of(&self, doc: &Document) -> Result<Vec<FileAsset>> {
        self.file_assets.fetch_many(&doc.attachment_ids).await
    }

    /// Metadata and bytes of an attachment, checked against its document.
    pub async fn open_attachment(
        &self,
        document_id: Uuid,
        file_id: Uuid,
    ) -> Result<(FileAsset, Vec<u8>)> {
        let doc = self.documents.fetch(document_id).await?;
        let asset = self.owned_asset(&doc, file_id).await?;
        let data = self.blobs.load(&asset.storage_key).await?;
        Ok((asset, data))
    }

    /// Store a file that belongs to no document. No text is extracted.
    pub async fn upload_file(
        &self,
        data: &[u8],
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<FileAsset> {
        if data.is_empty() {
            return Err(Error::InvalidInput("Uploaded file is empty".to_string()));
        }
        let filename = clean_filename(filename);
        let content_type = resolve_content_type(content_type, data);
        let blob = self.blobs.save_bytes(data, &filename).await?;
        let asset = self.insert_row(&blob, filename, content_type, None).await?;

        info!(
            subsystem = "db",
            component = "coordinator",
            op = "upload_file",
            file_asset_id = %asset.id,
            size_bytes = asset.size_bytes,
            "Standalone file stored"
        );
        Ok(asset)
    }

    /// File asset metadata.
    pub async fn file(&self, file_id: Uuid) -> Result<FileAsset> {
        self.file_assets.fetch(file_id).await
    }

    /// Metadata and bytes of any file asset.
    pub async fn open_file(&self, file_id: Uuid) -> Result<(FileAsset, Vec<u8>)> {
        let asset = self.file_assets.fetch(file_id).await?;
        let data = self.blobs.load(&asset.storage_key).await?;
        Ok((asset, data))
    }

    /// Delete a file asset by id, detaching it from its document if it has one.
    pub async fn delete_file(&self, file_id: Uuid) -> Result<()> {
        let asset = self.file_assets.fetch(file_id).await?;
        let owner = self.file_assets.owner_of(file_id).await?;

        self.delete_blob_best_effort(&asset.storage_key).await;

        match owner {
            Some(document_id) => {
                self.update_attachments(document_id, None, |doc| doc.detach(file_id))
                    .await?;
            }
            None => self.file_assets.delete(file_id).await?,
        }

        info!(
            subsystem = "db",
            component = "coordinator",
            op = "delete_file",
            file_asset_id = %file_id,
            document_id = ?owner,
            "File deleted"
        );
        Ok(())
    }

    /// Resolve `file_id` as an attachment of `doc`.
    async fn owned_asset(&self, doc: &Document, file_id: Uuid) -> Result<FileAsset> {
        if doc.owns(file_id) {
            return self.file_assets.fetch(file_id).await;
        }
        // Distinguish a file owned elsewhere from one that does not exist.
        self.file_assets.fetch(file_id).await?;
        Err(Error::AttachmentMismatch {
            document_id: doc.id,
            file_id,
        })
    }

    async fn insert_row(
        &self,
        blob: &StoredBlob,
        filename: String,
        content_type: String,
        extracted_text: Option<String>,
    ) -> Result<FileAsset> {
        let inserted = self
            .file_assets
            .insert(NewFileAsset {
                id: new_v7(),
                original_filename: filename,
                content_type,
                size_bytes: blob.size as i64,
                storage_key: blob.key.clone(),
                sha256: blob.sha256.clone(),
                extracted_text,
            })
            .await;

        match inserted {
            Ok(asset) => Ok(asset),
            Err(e) => {
                warn!(
                    subsystem = "db",
                    component = "coordinator",
                    op = "insert_file_asset",
                    storage_key = %blob.key,
                    error = %e,
                    "File asset insert failed, removing stored blob"
                );
                self.delete_blob_best_effort(&blob.key).await;
                Err(e)
            }
        }
    }

    /// Apply `change` to a document's attachment set and persist it,
    /// re-reading the document and re-applying on version conflicts.
    ///
    /// `change` returns false when there is nothing to write.
    async fn update_attachments<F>(
        &self,
        document_id: Uuid,
        loaded: Option<Document>,
        change: F,
    ) -> Result<Document>
    where
        F: Fn(&mut Document) -> bool + Send + Sync,
    {
        let mut current = loaded;
        let mut attempt = 1;
        loop {
            let mut doc = match current.take() {
                Some(doc) => doc,
                None => self.documents.fetch(document_id).await?,
            };
            if !change(&mut doc) {
                return Ok(doc);
            }
            match self.documents.save_attachments(&doc).await {
                Ok(saved) => return Ok(saved),
                Err(Error::Conflict(msg)) if attempt < defaults::ATTACH_MAX_ATTEMPTS => {
                    debug!(
                        subsystem = "db",
                        component = "coordinator",
                        op = "update_attachments",
                        document_id = %document_id,
                        attempt,
                        conflict = %msg,
                        "Attachment set changed concurrently, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn delete_blob_best_effort(&self, key: &str) {
        match self.blobs.delete(key).await {
            Ok(true) => {}
            Ok(false) => debug!(storage_key = %key, "Blob already absent"),
            Err(e) => warn!(
                subsystem = "db",
                component = "coordinator",
                storage_key = %key,
                error = %e,
                "Blob delete failed, row remains authoritative"
            ),
        }
    }
}
