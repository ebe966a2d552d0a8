//! Standalone file HTTP handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use docweave_core::FileAsset;

use super::{download_response, read_file_field};
use crate::{ApiError, AppState};

/// Upload a file that belongs to no document.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileAsset>), ApiError> {
    let upload = read_file_field(multipart).await?;
    let asset = state
        .coordinator
        .upload_file(
            &upload.data,
            &upload.filename,
            upload.content_type.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileAsset>, ApiError> {
    Ok(Json(state.coordinator.file(id).await?))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (asset, data) = state.coordinator.open_file(id).await?;
    Ok(download_response(asset, data))
}

/// Delete a file, detaching it from its document first if it has one.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.delete_file(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
