//! Persistent key-value namespace
//!
//! Everything the application stores goes through a [`KeyValueStore`]:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`FileStore`] for on-disk data, one file per key

mod file_store;
mod kv;
mod memory;

use std::path::PathBuf;

pub use file_store::FileStore;
pub use kv::{KeyValueStore, Result, StorageError, WriteBatch, WriteOp};
pub use memory::MemoryStore;

/// Get the default data directory
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join("pocket-classroom"))
        .ok_or(StorageError::DataDirNotFound)
}
