use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::warn;

use crate::kv::{KeyValueStore, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileStoreInitError {
    #[error("cannot resolve a data directory for this platform")]
    NoDataDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable key-value store backed by a single JSON file.
///
/// The whole map is held in memory and rewritten on every mutation, matching
/// the write-through behavior of a browser-local store. A missing file means
/// an empty store; an unreadable or malformed file degrades to empty rather
/// than failing open.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl FileStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreInitError` if the parent directory cannot be
    /// created. A corrupt store file is not an error: it is logged and
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileStoreInitError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries = Self::load(&path);
        Ok(Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// Open the store at the platform data directory (`progress.json`).
    ///
    /// # Errors
    ///
    /// Returns `FileStoreInitError::NoDataDir` if no home directory can be
    /// resolved, or an IO error if the directory cannot be created.
    pub fn open_default() -> Result<Self, FileStoreInitError> {
        let dirs =
            ProjectDirs::from("", "", "quizdrill").ok_or(FileStoreInitError::NoDataDir)?;
        Self::open(dirs.data_dir().join("progress.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> HashMap<String, String> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "store file unreadable, starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path.display(), %err, "store file malformed, starting empty");
                HashMap::new()
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        self.persist(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileStore>();
    }
}
