//! Error types for docweave.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using docweave's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docweave operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (document, file asset, summary, blob)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (empty upload, blank text, malformed key)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A file asset was addressed through a document that does not own it
    #[error("File {file_id} does not belong to document {document_id}")]
    AttachmentMismatch { document_id: Uuid, file_id: Uuid },

    /// Optimistic version check failed on an aggregate update
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob I/O failed for a reason other than absence
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The external NLP service was unreachable or answered badly
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a storage error, keeping the I/O cause as the error source.
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            context: context.into(),
            source,
        }
    }

    /// Whether the error was caused by the caller rather than the server.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidInput(_) | Error::AttachmentMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}
