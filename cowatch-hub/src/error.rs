//! Error types for cowatch-hub
//!
//! Handlers return [`Error`] directly; the `IntoResponse` impl maps it to a
//! status code and a JSON `{"error": ...}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the hub
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot model / configuration errors from the common crate
    #[error(transparent)]
    Common(#[from] cowatch_common::Error),

    /// Stored row could not be decoded
    #[error("Corrupt stored state: {0}")]
    CorruptState(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Relay task is gone (hub shutting down)
    #[error("Relay unavailable: {0}")]
    RelayClosed(String),
}

/// Convenience Result type using the hub Error
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Common(cowatch_common::Error::InvalidInput(_))
            | Error::Common(cowatch_common::Error::InvalidMediaUrl(_)) => StatusCode::BAD_REQUEST,
            Error::RelayClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
