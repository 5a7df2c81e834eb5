//! Error types for the Quizsync engine.

use thiserror::Error;

/// All possible errors from the Quizsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid test result: {0}")]
    InvalidResult(String),

    #[error("invalid exam: {0}")]
    InvalidExam(String),

    #[error("invalid aggregate stats: {0}")]
    InvalidStats(String),

    #[error("invalid document path: {0}")]
    InvalidPath(String),

    // Storage errors
    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
