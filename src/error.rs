//! Error types for the REST API and the realtime gateway.

use crate::db::StoreError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;

#[cfg(test)]
mod tests;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// API error types.
///
/// Every business-rule violation is raised as one of these at the point of
/// detection and rendered unchanged at the HTTP or socket boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (also used where existence must not leak).
    #[error("Not found: {0}")]
    NotFound(String),

    /// User missing or inactive.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Order missing or deactivated.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Balance lower than the requested stake.
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Balance at the time of the check.
        available: Decimal,
        /// Amount the operation needed.
        required: Decimal,
    },

    /// Entity not in the lifecycle state the operation expects.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unique or foreign key constraint violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store unavailable or timed out, safe to retry.
    #[error("Service temporarily unavailable: {0}")]
    Transient(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable classification.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UserNotFound(_) => "USER_NOT_FOUND",
            ApiError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ApiError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Transient(_) => "TRANSIENT_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::UserNotFound(_) | ApiError::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidState(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }

    /// Shorthand for the chat-session lookup failure, which is the same for
    /// absent and inaccessible sessions.
    #[must_use]
    pub fn session_not_found() -> Self {
        ApiError::NotFound("Chat session not found".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Unavailable(msg) => ApiError::Transient(msg),
            StoreError::RowNotFound => ApiError::NotFound("Record not found".to_string()),
            StoreError::Decode(msg) | StoreError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
