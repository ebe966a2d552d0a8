//! Centralized default constants for docweave.
//!
//! Every crate reads its defaults from here instead of defining its own
//! magic numbers. Environment variables may override most of them; the
//! variable names live next to the value they override.

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Upper bound on open PostgreSQL connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Connections kept open while idle.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// How long a request waits for a free connection before failing.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Idle connections above the minimum are closed after this long.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Environment variable overriding [`DB_MAX_CONNECTIONS`].
pub const ENV_DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";

/// Environment variable overriding [`DB_MIN_CONNECTIONS`].
pub const ENV_DB_MIN_CONNECTIONS: &str = "DB_MIN_CONNECTIONS";

/// Environment variable overriding [`DB_ACQUIRE_TIMEOUT_SECS`].
pub const ENV_DB_ACQUIRE_TIMEOUT_SECS: &str = "DB_ACQUIRE_TIMEOUT_SECS";

/// Environment variable overriding [`DB_IDLE_TIMEOUT_SECS`].
pub const ENV_DB_IDLE_TIMEOUT_SECS: &str = "DB_IDLE_TIMEOUT_SECS";

// =============================================================================
// BLOB STORAGE
// =============================================================================

/// Default root directory for stored blobs.
pub const UPLOAD_DIR: &str = "uploads";

/// Environment variable overriding [`UPLOAD_DIR`].
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";

/// Copy buffer size used while streaming bytes into the blob store.
pub const BLOB_COPY_BUFFER_BYTES: usize = 8 * 1024;

/// Maximum length of the extension suffix appended to a storage key.
pub const STORAGE_KEY_EXT_MAX_LEN: usize = 16;

// =============================================================================
// TEXT EXTRACTION
// =============================================================================

/// Maximum number of characters kept from an extraction.
pub const MAX_EXTRACTED_CHARS: usize = 100_000;

/// Timeout for external extraction commands (pdftotext, pandoc, catdoc).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Bytes read from an extraction command's stdout before it is stopped.
///
/// Four bytes per character covers any UTF-8 text up to the character cap.
pub const EXTRACTION_MAX_OUTPUT_BYTES: usize = MAX_EXTRACTED_CHARS * 4;

// =============================================================================
// SUMMARIZATION
// =============================================================================

/// Default maximum summary length (tokens, interpreted by the NLP service).
pub const SUMMARY_MAX_LENGTH: u32 = 150;

/// Default minimum summary length (tokens, interpreted by the NLP service).
pub const SUMMARY_MIN_LENGTH: u32 = 50;

/// Default summary style.
pub const SUMMARY_STYLE: &str = "concise";

/// Default number of concurrent summarization workers.
pub const SUMMARY_WORKERS: usize = 2;

/// Default capacity of the summarization queue.
pub const SUMMARY_QUEUE_CAPACITY: usize = 256;

/// Capacity of the pipeline event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// NLP SERVICE
// =============================================================================

/// Default base URL of the external NLP service.
pub const AI_SERVICE_URL: &str = "http://localhost:8000";

/// Fixed connect timeout for the NLP service.
pub const AI_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default overall request timeout for the NLP service.
pub const AI_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Environment variable overriding [`AI_SERVICE_URL`].
pub const ENV_AI_SERVICE_URL: &str = "AI_SERVICE_URL";

/// Environment variable overriding [`AI_REQUEST_TIMEOUT_MS`].
pub const ENV_AI_SERVICE_TIMEOUT_MS: &str = "AI_SERVICE_TIMEOUT_MS";

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Attempts at the optimistic read-modify-write of a document's attachment set.
pub const ATTACH_MAX_ATTEMPTS: usize = 5;

/// Content type recorded when the uploader supplied none and sniffing failed.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default maximum upload size in bytes (25 MiB).
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Default page size for document listings.
pub const PAGE_LIMIT: i64 = 20;

/// Upper bound on a requested page size.
pub const PAGE_LIMIT_MAX: i64 = 200;
