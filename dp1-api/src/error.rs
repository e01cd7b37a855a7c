use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Result type for HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

/// HTTP-facing error: an error tag, a status code, and a human-readable
/// message. `IntoResponse` renders `{"error": tag, "message": message}`.
#[derive(Debug)]
pub struct AppError {
    pub tag: &'static str,
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    #[must_use]
    pub fn new(tag: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self { tag, status, message: message.into() }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new("invalid_json", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("validation_error", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn protected_fields(fields: &[String]) -> Self {
        Self::new(
            "protected_fields",
            StatusCode::BAD_REQUEST,
            format!("Cannot update protected fields: {}", fields.join(", ")),
        )
    }

    #[must_use]
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::new("invalid_id", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn invalid_channel_id(message: impl Into<String>) -> Self {
        Self::new("invalid_channel_id", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn invalid_limit(message: impl Into<String>) -> Self {
        Self::new("invalid_limit", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn queue_error(message: impl Into<String>) -> Self {
        Self::new("queue_error", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new("storage_error", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("internal_error", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new("invalid_message", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::new("invalid_batch", StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn processing_failed(message: impl Into<String>) -> Self {
        Self::new("processing_failed", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn batch_processing_failed(message: impl Into<String>) -> Self {
        Self::new("batch_processing_failed", StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorBody { error: self.tag, message: self.message });
        (status, body).into_response()
    }
}

/// Maps `dp1_core::Error` onto the HTTP error taxonomy. Port failures are logged
/// with full detail server-side and surfaced to the client as an opaque
/// `storage_error`/`queue_error`.
impl From<dp1_core::Error> for AppError {
    fn from(err: dp1_core::Error) -> Self {
        use dp1_core::Error;

        match err {
            Error::NotFound(msg) => Self::not_found(msg),
            Error::AlreadyExists(msg) => Self::validation_error(msg),
            Error::InvalidInput(msg) => Self::validation_error(msg),
            Error::ProtectedFields(fields) => Self::protected_fields(&fields),
            Error::UrlResolution(msg) => Self::validation_error(msg),
            Error::Kv(msg) => {
                tracing::error!(error = %msg, "kv port failure");
                Self::storage_error("storage operation failed")
            }
            Error::Queue(msg) => {
                tracing::error!(error = %msg, "queue port failure");
                Self::queue_error("queue operation failed")
            }
            Error::Signing(msg) => {
                tracing::error!(error = %msg, "signing failure");
                Self::internal_error("signing is not configured")
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                Self::internal_error("internal error")
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_json(format!("invalid JSON body: {err}"))
    }
}

/// Maps a `dp1_core::storage::engine::validate_limit` failure onto
/// `invalid_limit`, preserving the core's own message instead of
/// substituting a route-local string.
#[must_use]
pub fn limit_error(err: dp1_core::Error) -> AppError {
    match err {
        dp1_core::Error::InvalidInput(msg) => AppError::invalid_limit(msg),
        other => other.into(),
    }
}
