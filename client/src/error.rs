//! Error types for the Quizsync client.

use thiserror::Error;

/// Failures talking to the remote document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("version conflict on {path}: expected {expected:?}")]
    VersionConflict {
        path: String,
        expected: Option<u64>,
    },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("remote store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Engine(#[from] quizsync_engine::Error),
}

impl RemoteError {
    /// Whether the same request may succeed later without changes.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Unavailable(_) | RemoteError::VersionConflict { .. } => true,
            RemoteError::Rejected { status, .. } => matches!(status, 408 | 429 | 500..),
            RemoteError::PermissionDenied(_)
            | RemoteError::InvalidDocument(_)
            | RemoteError::Engine(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidDocument(err.to_string())
        } else {
            RemoteError::Unavailable(err.to_string())
        }
    }
}

/// Errors surfaced by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("offline")]
    Offline,

    #[error("aggregate update gave up after {0} conflicting writes")]
    ContentionExhausted(u32),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Engine(#[from] quizsync_engine::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// Whether retrying the operation later may succeed.
    ///
    /// Local storage failures count as transient; validation failures and
    /// refusals by the remote store do not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Offline | ClientError::ContentionExhausted(_) => true,
            ClientError::Remote(e) => e.is_transient(),
            ClientError::Engine(e) => matches!(
                e,
                quizsync_engine::Error::Storage(_) | quizsync_engine::Error::QuotaExceeded { .. }
            ),
            ClientError::Config(_) => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
