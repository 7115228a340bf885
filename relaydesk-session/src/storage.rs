//! Session Storage - Durable store implementations
//!
//! `FileStore` keeps every key in a single JSON object on disk so the token and the
//! user always live side by side. `MemoryStore` is the process-local equivalent.

use relaydesk_core::{storage_error, DurableStore, RelayDeskError, RelayDeskResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// File name used inside the data directory
pub const SESSION_FILE_NAME: &str = "session.json";

/// In-memory durable store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> RelayDeskResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| storage_error!("memory store lock poisoned", "memory_store"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RelayDeskResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| storage_error!("memory store lock poisoned", "memory_store"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RelayDeskResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| storage_error!("memory store lock poisoned", "memory_store"))?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file backed durable store
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store inside `storage_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> RelayDeskResult<Self> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir).map_err(|e| {
            storage_error!(
                format!("Failed to create {}: {}", storage_dir.display(), e),
                "file_store",
                e
            )
        })?;

        let path = storage_dir.join(SESSION_FILE_NAME);
        info!("Session storage initialized at: {}", path.display());

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> RelayDeskResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json_data = std::fs::read_to_string(&self.path)?;
        if json_data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let entries: BTreeMap<String, String> =
            serde_json::from_str(&json_data).map_err(RelayDeskError::Serialization)?;
        Ok(entries)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> RelayDeskResult<()> {
        let json_data = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, json_data)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!("Saved {} session entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn update<F>(&self, mutate: F) -> RelayDeskResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| storage_error!("file store lock poisoned", "file_store"))?;

        // An undecodable file is replaced on the next write instead of blocking it
        let (mut entries, replace) = match self.read_entries() {
            Ok(entries) => (entries, false),
            Err(RelayDeskError::Serialization(e)) => {
                warn!(error = %e, path = %self.path.display(), "Replacing corrupted session file");
                (BTreeMap::new(), true)
            }
            Err(e) => return Err(e),
        };

        if mutate(&mut entries) || replace {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> RelayDeskResult<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> RelayDeskResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> RelayDeskResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}
