//! # docweave-api
//!
//! Thin HTTP surface over the docweave storage and summarization layers.
//! Handlers validate request shape, call the coordinator or a repository and
//! map errors to status codes. Business rules live in the lower crates.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use docweave_core::DocumentRepository;
use docweave_db::AttachmentCoordinator;
use docweave_jobs::SummaryService;

pub use config::{ServerConfig, StorageBackend};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentRepository>,
    pub coordinator: AttachmentCoordinator,
    pub summaries: SummaryService,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    use handlers::{attachments, documents, files, health, summaries};

    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route("/api/ai/health", get(health::ai_health))
        // Documents
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/api/documents/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        // Attachments
        .route(
            "/api/documents/:id/attachments",
            get(attachments::list_attachments).post(attachments::upload_attachment),
        )
        .route(
            "/api/documents/:id/attachments/:file_id",
            axum::routing::delete(attachments::delete_attachment),
        )
        .route(
            "/api/documents/:id/attachments/:file_id/download",
            get(attachments::download_attachment),
        )
        // Standalone files
        .route("/api/files", axum::routing::post(files::upload_file))
        .route(
            "/api/files/:id",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/api/files/:id/download", get(files::download_file))
        // Summaries
        .route(
            "/api/files/:id/summaries",
            get(summaries::list_summaries).delete(summaries::delete_summaries),
        )
        .route(
            "/api/files/:id/summaries/latest",
            get(summaries::latest_summary),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
