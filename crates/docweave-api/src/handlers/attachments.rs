//! Document attachment HTTP handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use docweave_core::{is_upload_allowed, FileAsset};

use super::{download_response, read_file_field};
use crate::{ApiError, AppState};

/// Upload a file and attach it to a document.
///
/// Only the content types in the upload allowlist are accepted.
///
/// # Returns
/// - 201 Created with the new file asset
/// - 400 Bad Request for empty files or disallowed content types
/// - 404 Not Found if the document doesn't exist
pub async fn upload_attachment(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileAsset>), ApiError> {
    let upload = read_file_field(multipart).await?;
    let content_type = upload.content_type.as_deref().unwrap_or_default();
    if !is_upload_allowed(content_type) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported content type: {}",
            if content_type.is_empty() { "(none)" } else { content_type }
        )));
    }

    let asset = state
        .coordinator
        .add_attachment(
            document_id,
            &upload.data,
            &upload.filename,
            Some(content_type),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<FileAsset>>, ApiError> {
    Ok(Json(state.coordinator.list_attachments(document_id).await?))
}

/// Detach and delete one attachment.
///
/// # Returns
/// - 204 No Content
/// - 404 Not Found if the document or file doesn't exist, or the file
///   belongs to another document
pub async fn delete_attachment(
    State(state): State<AppState>,
    Path((document_id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .coordinator
        .remove_attachment(document_id, file_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_attachment(
    State(state): State<AppState>,
    Path((document_id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (asset, data) = state
        .coordinator
        .open_attachment(document_id, file_id)
        .await?;
    Ok(download_response(asset, data))
}
