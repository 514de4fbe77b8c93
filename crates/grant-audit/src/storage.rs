//! Audit storage backends.
//!
//! The recorder persists finished entries through an [`AuditStore`]. Stores
//! are synchronous; a store backed by an async sink must block inside `save`
//! so that persistence is never reordered relative to the commit.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use grant_core::{AuditConfig, AuditEntry, StorageBackend};
use uuid::Uuid;

use crate::error::AuditError;
use crate::filter::AuditFilter;

/// Sink for persisted audit entries.
pub trait AuditStore: Send + Sync {
    /// Persist one finished entry.
    fn save(&self, entry: AuditEntry) -> Result<(), AuditError>;

    /// Query stored entries.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError>;

    /// Get an entry by ID.
    fn get(&self, entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError>;
}

/// Create a store based on configuration.
pub fn create_store(config: &AuditConfig) -> Result<Arc<dyn AuditStore>, AuditError> {
    match config.storage.backend {
        StorageBackend::Console => Ok(Arc::new(ConsoleStore)),
        StorageBackend::File => {
            let path = config.storage.file_path.as_deref().unwrap_or("audit.log");
            Ok(Arc::new(FileStore::new(path)?))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::None => Ok(Arc::new(NullStore)),
    }
}

/// Console store (human-readable lines on stdout).
pub struct ConsoleStore;

impl AuditStore for ConsoleStore {
    fn save(&self, entry: AuditEntry) -> Result<(), AuditError> {
        println!("{}", entry.to_log_line());
        Ok(())
    }

    fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(vec![])
    }

    fn get(&self, _entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        Ok(None)
    }
}

/// Discards every entry.
pub struct NullStore;

impl AuditStore for NullStore {
    fn save(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }

    fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(vec![])
    }

    fn get(&self, _entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        Ok(None)
    }
}

/// In-memory store, in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.read().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(entries.clone())
    }

    /// Number of stored entries.
    ///
    /// Entries are only ever appended whole, so a lock poisoned by a panicking
    /// writer still holds a consistent list and is counted as is.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for MemoryStore {
    fn save(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.write().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        entries.push(entry);
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(filter.apply(self.entries()?))
    }

    fn get(&self, entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        Ok(self.entries()?.into_iter().find(|e| e.entry_id == entry_id))
    }
}

/// JSON Lines file store; one entry per line, appended.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store, creating the file if it does not exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let file = std::fs::File::open(&self.path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

impl AuditStore for FileStore {
    fn save(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let json = serde_json::to_string(&entry)?;

        let _guard = self.write_lock.lock().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(filter.apply(self.read_all()?))
    }

    fn get(&self, entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        Ok(self.read_all()?.into_iter().find(|e| e.entry_id == entry_id))
    }
}
