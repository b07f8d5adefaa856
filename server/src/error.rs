//! Error responses for the post collection.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid post: {0}")]
    InvalidPost(String),

    #[error("post {0} not found")]
    PostNotFound(u64),

    #[error("post id space exhausted")]
    IdsExhausted,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidPost(_) => StatusCode::BAD_REQUEST,
            AppError::PostNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IdsExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::InvalidPost(reason) => ErrorBody {
                error: "invalid post".to_string(),
                details: Some(reason.clone()),
            },
            AppError::IdsExhausted => {
                tracing::error!(error = %self, "cannot assign post id");
                ErrorBody {
                    error: "internal server error".to_string(),
                    details: None,
                }
            }
            AppError::PostNotFound(_) => ErrorBody {
                error: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
