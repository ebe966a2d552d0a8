//! Domain models for docweave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// DOCUMENT
// =============================================================================

/// A document together with the ids of the file assets it owns.
///
/// `version` is bumped on every attachment-set write and checked by
/// [`crate::DocumentRepository::save_attachments`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Ids of owned file assets. Order carries no meaning.
    pub attachment_ids: Vec<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Whether `file_id` is one of this document's attachments.
    pub fn owns(&self, file_id: Uuid) -> bool {
        self.attachment_ids.contains(&file_id)
    }

    /// Add `file_id` to the attachment set. Returns false if already present.
    pub fn attach(&mut self, file_id: Uuid) -> bool {
        if self.owns(file_id) {
            return false;
        }
        self.attachment_ids.push(file_id);
        true
    }

    /// Remove `file_id` from the attachment set. Returns false if absent.
    pub fn detach(&mut self, file_id: Uuid) -> bool {
        let before = self.attachment_ids.len();
        self.attachment_ids.retain(|id| *id != file_id);
        self.attachment_ids.len() != before
    }
}

/// Request for creating a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Request for updating a document's text fields. Absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Request for listing documents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDocumentsRequest {
    /// Case-insensitive substring matched against title and content
    pub query: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListDocumentsRequest {
    /// Effective page size, clamped to `1..=PAGE_LIMIT_MAX`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(defaults::PAGE_LIMIT)
            .clamp(1, defaults::PAGE_LIMIT_MAX)
    }

    /// Effective offset, never negative.
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Trimmed, non-empty search needle.
    pub fn needle(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// One page of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Document>,
    pub total: i64,
}

// =============================================================================
// FILE ASSET
// =============================================================================

/// Metadata of a stored file. The bytes live in the blob store under
/// `storage_key`; `sha256` is the digest of exactly those bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAsset {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub sha256: String,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new file asset row.
///
/// New rows are unowned; a document takes ownership through
/// [`crate::DocumentRepository::save_attachments`].
#[derive(Debug, Clone)]
pub struct NewFileAsset {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub sha256: String,
    pub extracted_text: Option<String>,
}

/// Result of writing bytes to the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
    pub size: u64,
}

// =============================================================================
// SUMMARY
// =============================================================================

/// A persisted AI summary of a file asset's extracted text. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    /// Reference only; the file asset may since have been deleted.
    pub file_asset_id: Uuid,
    pub summary_text: String,
    pub model_name: String,
    pub style: String,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// DOCUMENT VIEW
// =============================================================================

/// A document as returned to readers: its fields plus each attachment with
/// the summaries recorded for it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub attachments: Vec<AttachmentView>,
}

/// One attachment of a [`DocumentView`], newest summary first.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentView {
    #[serde(flatten)]
    pub file: FileAsset,
    pub summaries: Vec<Summary>,
}

/// One page of document views.
#[derive(Debug, Clone, Serialize)]
pub struct ListDocumentViewsResponse {
    pub documents: Vec<DocumentView>,
    pub total: i64,
}

/// Values for a new summary row.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub file_asset_id: Uuid,
    pub summary_text: String,
    pub model_name: String,
    pub style: String,
    pub latency_ms: i64,
}

/// Summary generation parameters, passed through to the NLP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeOptions {
    pub max_length: u32,
    pub min_length: u32,
    pub style: String,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_length: defaults::SUMMARY_MAX_LENGTH,
            min_length: defaults::SUMMARY_MIN_LENGTH,
            style: defaults::SUMMARY_STYLE.to_string(),
        }
    }
}

/// What the NLP service returned for one summarization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub latency_ms: i64,
    #[serde(default)]
    pub input_length: Option<i64>,
    #[serde(default)]
    pub summary_length: Option<i64>,
    #[serde(default)]
    pub style: Option<String>,
}
