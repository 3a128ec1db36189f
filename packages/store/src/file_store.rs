//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is the durable [`KeyValueStore`] used on desktop and mobile,
//! where there is no `localStorage`. Each key is one file whose contents are
//! the value.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── herichain_user             # JSON profile
//! └── herichain_has_seen_modal   # "true"
//! ```
//!
//! Keys must be plain file names. A key containing a path separator or `..`
//! is rejected on write and reads as absent.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::kv::{KeyValueStore, StoreError};

/// Filesystem-backed KeyValueStore for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn key_path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\']);
        valid.then(|| self.base.join(key))
    }

    fn require_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        self.key_path(key).ok_or_else(|| StoreError::Rejected {
            key: key.to_string(),
            reason: "key is not a plain file name".to_string(),
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)?).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.require_path(key)?;
        let io = |source: std::io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.base).map_err(io)?;
        std::fs::write(path, value).map_err(io)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.require_path(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
