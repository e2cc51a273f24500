//! Error types for DocKV
//!
//! Two layers:
//! - [`BackendError`]: what a document backend reports
//! - [`DocKvError`]: what the store facade surfaces to callers

use thiserror::Error;

/// Result type alias using DocKvError
pub type Result<T> = std::result::Result<T, DocKvError>;

/// Result type alias for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum DocKvError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection to {uri} failed: {source}")]
    Connection {
        uri: String,
        #[source]
        source: BackendError,
    },

    // -------------------------------------------------------------------------
    // Operation Errors
    // -------------------------------------------------------------------------
    #[error("Operation '{op}' failed: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: BackendError,
    },

    // -------------------------------------------------------------------------
    // Permission Errors
    // -------------------------------------------------------------------------
    #[error("Permission denied: {0}")]
    Permission(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Transform Errors
    // -------------------------------------------------------------------------
    #[error("Transform failed: {0}")]
    Transform(String),
}

impl DocKvError {
    /// The backend failure behind a connection or operation error, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            DocKvError::Connection { source, .. } | DocKvError::Operation { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Failures reported by a document backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A document violated the collection schema
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Internal backend error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for BackendError {
    fn from(err: bincode::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}
