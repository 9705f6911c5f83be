//! Error types for the privilege query engine

use thiserror::Error;

/// Privilege query errors
#[derive(Debug, Error)]
pub enum PrivilegeError {
    /// The binding source could not be listed
    #[error("Binding source unavailable: {0}")]
    SourceUnavailable(String),

    /// The result tree could not be encoded
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Query configuration rejected at construction
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Subject pattern is not a valid regular expression
    #[error("Invalid subject pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Grant lookup error reported by a fetcher
    #[error("Grant fetch failed: {0}")]
    Fetch(String),

    /// RBAC manifest could not be decoded
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PrivilegeError {
    fn from(err: serde_json::Error) -> Self {
        PrivilegeError::SerializationFailed(err.to_string())
    }
}

impl From<serde_yaml::Error> for PrivilegeError {
    fn from(err: serde_yaml::Error) -> Self {
        PrivilegeError::SerializationFailed(err.to_string())
    }
}

/// Result type for privilege operations
pub type Result<T> = std::result::Result<T, PrivilegeError>;
