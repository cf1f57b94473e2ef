//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps service errors to HTTP status codes and a JSON body carrying a
//! machine-readable code and a message. Store failures are logged and
//! reported as a generic internal error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use outpass_core::AccessError;
use outpass_service::OutpassError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "TOKEN_MISMATCH").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed domain validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request is not pending (409).
    #[error("{0}")]
    InvalidState(String),

    /// Request is not approved (409).
    #[error("{0}")]
    NotApproved(String),

    /// Checkpoint payload is not a well-formed token (422).
    #[error("{0}")]
    MalformedToken(String),

    /// Token resident does not own the named request (422).
    #[error("{0}")]
    TokenMismatch(String),

    /// Movement breaks the alternating exit/return sequence (409).
    #[error("{0}")]
    OutOfSequence(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::NotApproved(_) => (StatusCode::CONFLICT, "NOT_APPROVED"),
            Self::MalformedToken(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_TOKEN"),
            Self::TokenMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "TOKEN_MISMATCH"),
            Self::OutOfSequence(_) => (StatusCode::CONFLICT, "OUT_OF_SEQUENCE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthorized(err.to_string()),
            AccessError::Forbidden { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<OutpassError> for AppError {
    fn from(err: OutpassError) -> Self {
        match err {
            OutpassError::Validation(_) => Self::Validation(err.to_string()),
            OutpassError::NotFound(_) => Self::NotFound(err.to_string()),
            OutpassError::InvalidState { .. } => Self::InvalidState(err.to_string()),
            OutpassError::NotApproved { .. } => Self::NotApproved(err.to_string()),
            OutpassError::MalformedToken(_) => Self::MalformedToken(err.to_string()),
            OutpassError::TokenMismatch { .. } => Self::TokenMismatch(err.to_string()),
            OutpassError::OutOfSequence { .. } => Self::OutOfSequence(err.to_string()),
            OutpassError::Access(access) => access.into(),
            OutpassError::Store(_) => Self::Internal(err.to_string()),
        }
    }
}
