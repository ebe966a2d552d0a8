//! HTTP handlers.

pub mod attachments;
pub mod documents;
pub mod files;
pub mod health;
pub mod summaries;

use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use docweave_core::FileAsset;

use crate::ApiError;

/// A file read from a multipart upload.
pub(crate) struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Read the `file` field of a multipart body.
pub(crate) async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("file").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();
        if data.is_empty() {
            return Err(ApiError::BadRequest("Empty file".to_string()));
        }
        return Ok(UploadedFile {
            data,
            filename,
            content_type,
        });
    }
    Err(ApiError::BadRequest(
        "No file uploaded. Use field name 'file'.".to_string(),
    ))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File size exceeds maximum allowed size".to_string())
    } else {
        ApiError::BadRequest(format!("Failed to read upload: {}", e.body_text()))
    }
}

/// Response carrying a file's bytes as a download.
pub(crate) fn download_response(asset: FileAsset, data: Vec<u8>) -> impl IntoResponse {
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&asset.original_filename)
    );
    let headers = [
        (header::CONTENT_TYPE, asset.content_type),
        (header::CONTENT_LENGTH, data.len().to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    (headers, data)
}
