//! # Web Storage backend — browser-side persistence
//!
//! [`WebStorage`] wraps the browser's `localStorage` (durable, per origin) or
//! `sessionStorage` (cleared when the tab's browsing session ends). The
//! profile lives in the former; the referral slot and onboarding flag in the
//! latter.
//!
//! ## Connection management
//!
//! The struct only remembers which area it targets and looks the `Storage`
//! object up from `window` on every call, so it stays `Copy` and never holds
//! a JS handle across an await point.
//!
//! ## Error handling
//!
//! Reads swallow errors (a blocked or missing storage area reads as empty).
//! Writes surface [`StoreError::Unavailable`] when there is no storage at all
//! and [`StoreError::Rejected`] when the browser throws, typically on quota.

use wasm_bindgen::JsValue;

use crate::kv::{KeyValueStore, StoreError};

/// Which Web Storage area a [`WebStorage`] targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArea {
    Local,
    Session,
}

/// Web Storage backed KeyValueStore for the web platform.
#[derive(Clone, Copy, Debug)]
pub struct WebStorage {
    area: StorageArea,
}

impl WebStorage {
    /// `window.localStorage`
    pub fn local() -> Self {
        Self {
            area: StorageArea::Local,
        }
    }

    /// `window.sessionStorage`
    pub fn session() -> Self {
        Self {
            area: StorageArea::Session,
        }
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    fn storage(&self) -> Result<web_sys::Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        let storage = match self.area {
            StorageArea::Local => window.local_storage(),
            StorageArea::Session => window.session_storage(),
        };
        storage
            .map_err(|e| StoreError::Unavailable(js_message(&e)))?
            .ok_or_else(|| StoreError::Unavailable(format!("{:?} storage disabled", self.area)))
    }
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage().ok()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage()?.set_item(key, value).map_err(|e| {
            tracing::warn!(key, area = ?self.area, "web storage write failed");
            StoreError::Rejected {
                key: key.to_string(),
                reason: js_message(&e),
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Rejected {
                key: key.to_string(),
                reason: js_message(&e),
            })
    }
}
