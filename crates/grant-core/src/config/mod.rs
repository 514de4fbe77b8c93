//! Declaration files for Grant.
//!
//! Grants and audits can be declared in code or loaded from a YAML file:
//!
//! ```yaml
//! audit:
//!   enabled: true
//!   storage:
//!     backend: file
//!     file_path: audit.log
//! entities:
//!   Post:
//!     attributes: [title, body]
//!     grants:
//!       - rule: [create, update]
//!         when: is_admin
//!     attribute_grants:
//!       - rule: [title]
//!         when: is_author
//!     audits:
//!       - actions: [update]
//!         only: [title]
//!         message: "{actor} edited {subject}"
//! ```
//!
//! Predicates are referenced by name and resolved when the declarations are
//! built into policies.

pub mod audit;
pub mod entity;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub use audit::{AuditConfig, StorageBackend, StorageConfig};
pub use entity::{AuditDeclarationConfig, EntityDeclaration, GrantDeclaration};

/// Complete declaration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantConfig {
    /// Audit capture configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Declarations keyed by entity type.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDeclaration>,
}

/// Invalid or unreadable declaration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GrantConfig {
    /// Load declarations from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse declarations from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityDeclaration> {
        self.entities.get(entity_type)
    }

    /// Validate every entity declaration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (entity_type, decl) in &self.entities {
            decl.validate(entity_type)?;
        }
        Ok(())
    }
}
