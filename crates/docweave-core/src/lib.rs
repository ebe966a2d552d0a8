//! # docweave-core
//!
//! Core types, traits, and abstractions for docweave.
//!
//! This crate provides the domain models (documents, file assets, summaries),
//! the error taxonomy, and the repository traits that the storage, inference
//! and job crates implement or depend on.
//!
//! ## Log Level Contract
//!
//! Every crate logs through `tracing` with literal `subsystem`, `component`
//! and `op` fields.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Best-effort step failed and was swallowed (blob delete, extraction, summary) |
//! | INFO  | Lifecycle events, completed operations |
//! | DEBUG | Decision points, intermediate values |

pub mod content_type;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use content_type::{
    file_extension, is_upload_allowed, resolve_content_type, UPLOAD_ALLOWED_TYPES,
};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

/// Generate a new time-ordered UUIDv7 identifier.
#[inline]
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
