//! Request Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors answered before a streaming response has started.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Signature headers or body missing.
    #[error("Missing signature headers")]
    MissingCredentials,

    /// Signature rejected. Deliberately silent about which check failed.
    #[error("Unauthorized")]
    Unauthorized,

    /// Body exceeds the configured size limit.
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Verified body is not a valid request document.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request parsed but a required value is missing or wrong.
    #[error("{0}")]
    Validation(String),
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::MissingCredentials => (StatusCode::BAD_REQUEST, "MISSING_SIGNATURE"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::InvalidBody(_) => (StatusCode::BAD_REQUEST, "INVALID_BODY"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for request handlers.
pub type RequestResult<T> = Result<T, RequestError>;
