//! Summary HTTP handlers.
//!
//! Summaries are keyed by file asset id and may outlive the file itself.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use docweave_core::Summary;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct DeleteSummariesResponse {
    pub deleted: u64,
}

/// All summaries for a file, newest first.
pub async fn list_summaries(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Vec<Summary>>, ApiError> {
    Ok(Json(state.summaries.summaries_for_file(file_id).await?))
}

/// The newest summary for a file.
///
/// # Returns
/// - 200 OK with the summary
/// - 404 Not Found if none has been produced
pub async fn latest_summary(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Summary>, ApiError> {
    Ok(Json(state.summaries.latest_summary(file_id).await?))
}

pub async fn delete_summaries(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<DeleteSummariesResponse>, ApiError> {
    let deleted = state.summaries.delete_summaries_for_file(file_id).await?;
    Ok(Json(DeleteSummariesResponse { deleted }))
}
