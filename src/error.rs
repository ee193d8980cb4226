// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global application error enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 404: unknown test / attempt / question.
    NotFound(String),

    // 403: allow-list, organization or time-window failure.
    AccessDenied(String),

    // 409: operation does not apply to the attempt's current status
    // (e.g. submit on an already-submitted attempt, evaluate after
    // finalization).
    InvalidState(String),

    // 409: attempt ceiling reached for this (candidate, test) pair.
    LimitExceeded(String),

    // 400: malformed answers or manual-scores payload.
    ValidationFailed(String),

    // 401: missing or invalid identity token.
    AuthError(String),

    // 500
    Internal(String),
}

impl AppError {
    /// Stable machine-readable discriminator carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::AccessDenied(_) => "access_denied",
            AppError::InvalidState(_) => "invalid_state",
            AppError::LimitExceeded(_) => "limit_exceeded",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::AuthError(_) => "auth_error",
            AppError::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with the appropriate status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg),
            AppError::LimitExceeded(msg) => (StatusCode::CONFLICT, msg),
            AppError::ValidationFailed(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Allows using the `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Stored JSON columns that fail to decode are data corruption, not caller
/// mistakes.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
