//! Request-facing error taxonomy.
//!
//! Every rejection the gates or handlers produce maps to exactly one
//! variant here, and every variant maps to one status code with a plain-text
//! body. Internal causes are logged, never returned to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body or a path value could not be understood.
    #[error("{0}")]
    MalformedRequest(String),

    /// Missing or unverifiable credentials.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// The caller's bucket is empty.
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Anything the caller cannot act on (signing failures, worker panics).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "Request failed with internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
