//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//!
//! Upload failures are JSON `{"error": "..."}` bodies with a reason the
//! client can act on. Access failures of every kind collapse into one
//! plain-text 404 so that a caller cannot tell an unknown link from a wrong
//! token, an expired link, or a server-side inconsistency. Internal error
//! details are logged and never returned.

use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pdfgate_vault::{AccessError, IssueError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Body of every denied view or file request.
pub const DENIAL_BODY: &str = "Not found or expired";

pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const NOT_PDF_MESSAGE: &str = "Only PDF allowed";
pub const TOO_LARGE_MESSAGE: &str = "File too large";
pub const STORAGE_FAILURE_MESSAGE: &str = "Storage failure";

/// JSON error body for upload failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upload rejected (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upload body over the configured cap (413).
    #[error("payload too large")]
    PayloadTooLarge,

    /// View or file request refused (404, uniform body).
    #[error("access denied: {0}")]
    Denied(AccessError),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Denied(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            Self::Denied(_) => {
                return (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    DENIAL_BODY,
                )
                    .into_response();
            }
            Self::BadRequest(message) => message,
            Self::PayloadTooLarge => TOO_LARGE_MESSAGE.to_string(),
            Self::Internal(detail) => {
                tracing::error!(code, error = %detail, "internal server error");
                STORAGE_FAILURE_MESSAGE.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::MissingPayload => Self::BadRequest(NO_FILE_MESSAGE.to_string()),
            IssueError::UnsupportedType { .. } => Self::BadRequest(NOT_PDF_MESSAGE.to_string()),
            IssueError::StorageFailure(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        Self::Denied(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
