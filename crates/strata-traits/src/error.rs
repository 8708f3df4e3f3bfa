//! Error types for store operations.

use thiserror::Error;

/// Common error type for store operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Requested record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Record already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Parse/deserialization error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Backend-specific failure
    #[error("backend error: {0}")]
    BackendError(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::IoError(e.to_string())
    }
}
