//! Error types for the kernel crate.

use grant_audit::AuditError;
use grant_core::ConfigError;
use grant_policy::PermissionDenied;
use thiserror::Error;

/// Errors surfaced by the host extension points and policy builders.
#[derive(Debug, Error)]
pub enum GrantError {
    /// Invalid grant or audit declaration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transition was not granted.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    /// An audit entry could not be persisted.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl GrantError {
    /// The denial, when this error is one.
    pub fn as_denied(&self) -> Option<&PermissionDenied> {
        match self {
            GrantError::PermissionDenied(denied) => Some(denied),
            _ => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        self.as_denied().is_some()
    }
}
