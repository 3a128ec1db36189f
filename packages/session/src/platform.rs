//! Platform-appropriate session constructor.
//!
//! - **Web** (WASM + `web` feature): `localStorage` for the profile,
//!   `sessionStorage` for the referral slot and onboarding flag.
//! - **Desktop / Mobile** (native): a directory under the platform data dir
//!   for the profile, memory for the per-run flags.
//! - **WASM without `web`**: memory for both.

use store::KeyValueStore;

use crate::config::SessionConfig;
use crate::reconciler::SessionReconciler;
use crate::wallet::WalletConnector;

/// Create a reconciler over the platform's default stores.
pub fn make_session<W: WalletConnector>(
    wallet: W,
    config: SessionConfig,
) -> SessionReconciler<impl KeyValueStore, impl KeyValueStore, W> {
    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    {
        SessionReconciler::new(
            store::WebStorage::local(),
            store::WebStorage::session(),
            wallet,
            config,
        )
    }
    #[cfg(all(target_arch = "wasm32", not(feature = "web")))]
    {
        SessionReconciler::new(store::MemoryStore::new(), store::MemoryStore::new(), wallet, config)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let base = dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("herichain");
        make_session_in(base, wallet, config)
    }
}

/// Native session whose profile lives under `base`.
#[cfg(not(target_arch = "wasm32"))]
pub fn make_session_in<W: WalletConnector>(
    base: std::path::PathBuf,
    wallet: W,
    config: SessionConfig,
) -> SessionReconciler<impl KeyValueStore, impl KeyValueStore, W> {
    SessionReconciler::new(store::FileStore::new(base), store::MemoryStore::new(), wallet, config)
}
