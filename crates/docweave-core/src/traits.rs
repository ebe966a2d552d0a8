//! Core traits for docweave abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Repository for documents and their attachment sets.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Create a document. Blank titles are rejected.
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Document>;

    /// Fetch a document with its attachment ids.
    async fn fetch(&self, id: Uuid) -> Result<Document>;

    /// List documents, most recently updated first.
    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse>;

    /// Update title and/or content.
    async fn update(&self, id: Uuid, req: UpdateDocumentRequest) -> Result<Document>;

    /// Persist the document's attachment set.
    ///
    /// Succeeds only when the stored version equals `doc.version`; the stored
    /// version is then incremented. Listed file assets become owned by the
    /// document, previously owned ones no longer listed are deleted.
    /// Returns the updated document. Stale versions yield `Error::Conflict`.
    async fn save_attachments(&self, doc: &Document) -> Result<Document>;

    /// Delete a document and every file asset row it owns.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// FILE ASSET REPOSITORY
// =============================================================================

/// Repository for file asset metadata rows.
#[async_trait]
pub trait FileAssetRepository: Send + Sync {
    /// Insert a new row.
    async fn insert(&self, asset: NewFileAsset) -> Result<FileAsset>;

    /// Fetch one row.
    async fn fetch(&self, id: Uuid) -> Result<FileAsset>;

    /// Fetch all rows among `ids` that exist, in creation order.
    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<FileAsset>>;

    /// The document owning this file asset, if any.
    async fn owner_of(&self, id: Uuid) -> Result<Option<Uuid>>;

    /// Delete one row.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// SUMMARY REPOSITORY
// =============================================================================

/// Repository for summaries.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn insert(&self, summary: NewSummary) -> Result<Summary>;

    /// All summaries for a file asset, newest first.
    async fn list_for_file(&self, file_asset_id: Uuid) -> Result<Vec<Summary>>;

    /// The newest summary for a file asset.
    async fn latest_for_file(&self, file_asset_id: Uuid) -> Result<Option<Summary>>;

    /// Delete all summaries for a file asset. Returns the number removed.
    async fn delete_for_file(&self, file_asset_id: Uuid) -> Result<u64>;
}

// =============================================================================
// PIPELINE SEAMS
// =============================================================================

/// Best-effort text extraction. Implementations never fail.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Whether text can be extracted from this content type.
    fn is_supported(&self, content_type: &str) -> bool;

    /// Extract text, capped in length. Returns an empty string on any failure.
    async fn extract_text(&self, data: &[u8], filename: &str) -> String;
}

/// A sink accepting background summarization requests.
///
/// Scheduling never blocks and never fails from the caller's point of view.
pub trait SummaryScheduler: Send + Sync {
    fn schedule(&self, file_asset_id: Uuid, text: String);
}

/// Scheduler that discards every request, for deployments without an NLP service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl SummaryScheduler for NoopScheduler {
    fn schedule(&self, _file_asset_id: Uuid, _text: String) {}
}

// =============================================================================
// NLP SERVICE
// =============================================================================

/// A service producing summaries of text.
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// Summarize `text` in a single attempt.
    async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<SummaryResult>;

    /// Whether the service is reachable. Never fails.
    async fn is_healthy(&self) -> bool;
}
