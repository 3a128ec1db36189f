//! Key-value storage ports for Herichain session state.
//!
//! Two stores back a session: a durable one that survives browser restarts
//! (`localStorage`, or a directory on native) and an ephemeral one scoped to a
//! single browser session (`sessionStorage`, or memory on native). Both are
//! reached through the [`KeyValueStore`] trait so the session logic never
//! touches a concrete backend.

pub mod kv;

mod memory;
pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod web_storage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use web_storage::{StorageArea, WebStorage};

pub use kv::{KeyValueStore, StoreError};
