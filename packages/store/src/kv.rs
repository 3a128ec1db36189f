//! # The storage port
//!
//! [`KeyValueStore`] is a string-to-string map with three operations. It is
//! deliberately the same shape as the browser's Web Storage API so that the
//! browser backend is a thin wrapper, and the memory and filesystem backends
//! can stand in for it in tests and native builds.
//!
//! ## Error handling
//!
//! Reads never fail: a backend that cannot read a key reports it as absent.
//! Writes and removals return [`StoreError`] so callers can decide whether a
//! lost write matters.

use thiserror::Error;

/// Synchronous string key-value store.
pub trait KeyValueStore {
    /// Read a value. Unreadable or missing keys are `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Whether a non-empty value is stored under `key`.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }
}

/// Errors raised by store backends on write.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure in [`crate::FileStore`].
    #[error("I/O error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend could not be reached at all (no window, storage disabled).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the write (quota exceeded, invalid key).
    #[error("write rejected for key '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

impl StoreError {
    /// Check if the backend was missing rather than failing mid-operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
