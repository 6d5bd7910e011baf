//! Local storage module
//!
//! Handles:
//! - Session cache mirror (file-backed or in-memory)

mod local;

pub use local::{FileStore, LocalStore, MemoryStore, is_valid_key};

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Build the store selected by configuration.
pub fn build_local_store(config: &StorageConfig) -> Arc<dyn LocalStore> {
    match config.backend {
        StorageBackend::File => {
            let store = FileStore::new(config.path.clone());
            tracing::info!(path = %store.dir().display(), "Local store backend: file");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::info!("Local store backend: memory");
            Arc::new(MemoryStore::new())
        }
    }
}
