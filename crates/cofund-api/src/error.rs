//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`EngineError`] kinds to HTTP status codes and renders a JSON
//! body with a machine-readable code, a message, and optional details.
//! Blocking reports from the project gate travel verbatim in `details`.
//! Internal error messages are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use cofund_engine::EngineError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    pub message: String,
    /// `{ message, blocking: [...] }` when a bulk check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Not the owner, bidder, or council member the action requires (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Duplicate resource (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// State precondition violated (409). `details` carries a blocking report.
    #[error("invalid state: {message}")]
    InvalidState {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Fulfilment already confirmed (409).
    #[error("already confirmed: {0}")]
    AlreadyConfirmed(String),

    /// Observation already resolved (409).
    #[error("already resolved: {0}")]
    AlreadyResolved(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::AlreadyConfirmed(_) => (StatusCode::CONFLICT, "ALREADY_CONFIRMED"),
            Self::AlreadyResolved(_) => (StatusCode::CONFLICT, "ALREADY_RESOLVED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::InvalidState { message, .. } => message.clone(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match self {
            Self::InvalidState { details, .. } => details,
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => Self::NotFound(err.to_string()),
            EngineError::Forbidden(msg) => Self::Forbidden(msg),
            EngineError::InvalidState { .. } => Self::InvalidState {
                message: err.to_string(),
                details: None,
            },
            EngineError::Blocked(report) => {
                let details = serde_json::to_value(&report).map_err(|e| {
                    tracing::error!(error = %e, "failed to serialize blocking report");
                });
                Self::InvalidState {
                    message: report.message,
                    details: details.ok(),
                }
            }
            EngineError::AlreadyConfirmed(id) => Self::AlreadyConfirmed(id),
            EngineError::AlreadyResolved(id) => Self::AlreadyResolved(id),
            EngineError::ValidationFailed(msg) => Self::Validation(msg),
            EngineError::DuplicateOffer { .. } => Self::Conflict(err.to_string()),
        }
    }
}
