//! Document HTTP handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use docweave_core::{
    AttachmentView, CreateDocumentRequest, Document, DocumentView, ListDocumentsRequest,
    ListDocumentViewsResponse, UpdateDocumentRequest,
};

use crate::{ApiError, AppState};

/// Create a document.
///
/// # Returns
/// - 201 Created with the document
/// - 400 Bad Request if the title is blank
pub async fn create_document(
    State(state): State<AppState>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let doc = state.documents.insert(req).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Attach each attachment's metadata, extracted text and summaries.
///
/// Summaries come from whatever the pipeline has recorded so far, so a fresh
/// attachment may still show none.
pub(crate) async fn document_view(
    state: &AppState,
    document: Document,
) -> docweave_core::Result<DocumentView> {
    let files = state.coordinator.attachments_of(&document).await?;
    let mut attachments = Vec::with_capacity(files.len());
    for file in files {
        let summaries = state.summaries.summaries_for_file(file.id).await?;
        attachments.push(AttachmentView { file, summaries });
    }
    Ok(DocumentView {
        document,
        attachments,
    })
}

/// List documents, most recently updated first, each with its attachments.
///
/// # Query Parameters
/// - `query`: case-insensitive title/content filter (optional)
/// - `limit`, `offset`: paging
pub async fn list_documents(
    State(state): State<AppState>,
    Query(req): Query<ListDocumentsRequest>,
) -> Result<Json<ListDocumentViewsResponse>, ApiError> {
    let page = state.documents.list(req).await?;
    let mut documents = Vec::with_capacity(page.documents.len());
    for document in page.documents {
        documents.push(document_view(&state, document).await?);
    }
    Ok(Json(ListDocumentViewsResponse {
        documents,
        total: page.total,
    }))
}

/// Fetch one document with its attachments and their summaries.
///
/// # Returns
/// - 200 OK with the document view
/// - 404 Not Found if the document doesn't exist
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentView>, ApiError> {
    let document = state.documents.fetch(id).await?;
    Ok(Json(document_view(&state, document).await?))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.documents.update(id, req).await?))
}

/// Delete a document together with its attachments.
///
/// # Returns
/// - 204 No Content
/// - 404 Not Found if the document doesn't exist
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deletion = state.coordinator.delete_document_with_attachments(id).await?;
    info!(
        document_id = %id,
        attachments = deletion.attachments,
        blob_failures = deletion.blob_failures,
        "Document deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
