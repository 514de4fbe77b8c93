//! Audit capture configuration.

use serde::{Deserialize, Serialize};

/// Configuration for audit capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit capture is enabled at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage backend type.
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path (for file backend).
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Storage backend type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Print entries to stdout.
    #[default]
    Console,
    /// Append entries to a JSON Lines file.
    File,
    /// Keep entries in memory (queryable).
    Memory,
    /// Discard entries.
    None,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
