//! API error type and its JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kinship_auth::AuthError;
use kinship_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication, authorization or account flow failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Request body, query or path failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// HTTP status code.
    pub status_code: u16,
    /// Human readable message.
    pub message: String,
    /// Status reason phrase.
    pub error: &'static str,
}

impl ApiError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status and client-facing message.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Auth(AuthError::Storage(e)) | ApiError::Storage(e) => storage_status(e),
            ApiError::Auth(e) if e.is_unauthorized() => {
                (StatusCode::UNAUTHORIZED, e.public_message().to_string())
            }
            ApiError::Auth(e @ (AuthError::InvalidCredentials | AuthError::EmailTaken)) => {
                (StatusCode::BAD_REQUEST, e.public_message().to_string())
            }
            ApiError::Auth(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.public_message().to_string()),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        }
    }
}

fn storage_status(e: &StorageError) -> (StatusCode, String) {
    match e {
        StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        StorageError::AlreadyExists(_) => {
            (StatusCode::BAD_REQUEST, "Resource already exists".to_string())
        }
        StorageError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
        StorageError::ConnectionFailed(_) | StorageError::QueryFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            error: status.canonical_reason().unwrap_or("Error"),
        };
        (status, Json(body)).into_response()
    }
}
