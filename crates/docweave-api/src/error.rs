//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use docweave_core::Error;

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Errors from the storage and pipeline layers.
    Core(Error),
    /// Request-shape problems detected by the HTTP layer itself.
    BadRequest(String),
    PayloadTooLarge(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Core(err) => match err {
                Error::NotFound(_) | Error::AttachmentMismatch { .. } => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                Error::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                Error::Upstream(_) => {
                    error!(error = %err, "Upstream service failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        "Upstream service unavailable".to_string(),
                    )
                }
                other => {
                    error!(error = %other, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An unexpected error occurred".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status(err: ApiError) -> StatusCode {
        err.status_and_message().0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(Error::NotFound("x".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(
                Error::AttachmentMismatch {
                    document_id: Uuid::nil(),
                    file_id: Uuid::nil(),
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(Error::InvalidInput("x".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::Conflict("x".into()).into()), StatusCode::CONFLICT);
        assert_eq!(status(Error::Upstream("x".into()).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(Error::Internal("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_faults_hide_details() {
        let err: ApiError = Error::storage("write blob", std::io::Error::other("/srv/secret")).into();
        let (code, message) = err.status_and_message();
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("secret"));
    }
}
