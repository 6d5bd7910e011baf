//! Key/value stores backing the session cache
//!
//! Values are opaque strings; callers own their encoding. Every write
//! replaces the whole value.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::AppError;

/// A tiny string store with browser-local-storage semantics.
pub trait LocalStore: Send + Sync {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Delete `key`. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Whether `key` is usable as a store key (and therefore as a file stem).
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn check_key(key: &str) -> Result<(), AppError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(AppError::Storage(format!("invalid store key {:?}", key)))
    }
}

// =============================================================================
// File Store
// =============================================================================

/// One JSON file per key under a directory.
///
/// Writes go through a temp file in the same directory and are renamed
/// into place, so readers never observe a half-written value.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        check_key(key)?;
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        check_key(key)?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::Storage(format!("create {}: {e}", self.dir.display())))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| AppError::Storage(format!("temp file for {key}: {e}")))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| AppError::Storage(format!("write {key}: {e}")))?;
        tmp.persist(self.path_for(key))
            .map_err(|e| AppError::Storage(format!("persist {key}: {}", e.error)))?;

        tracing::debug!(key, bytes = value.len(), "Local store entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        check_key(key)?;
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                tracing::debug!(key, "Local store entry removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("remove {key}: {e}"))),
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Process-local store; contents vanish on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        check_key(key)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
