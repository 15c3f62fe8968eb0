//! Common error types for cowatch

use thiserror::Error;

/// Common result type for cowatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the hub and the client
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// URL did not match any known media shape
    #[error("Invalid Link: {0}")]
    InvalidMediaUrl(String),
}
