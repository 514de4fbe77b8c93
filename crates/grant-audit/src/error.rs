//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while persisting or querying audit entries.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The store rejected or failed to handle an entry.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An entry failed validation and was not persisted.
    #[error("invalid audit entry: {0}")]
    InvalidEntry(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
