//! # Herichain session core
//!
//! Decides who the current user is and keeps the stored profile in step with
//! wallet connections and login forms.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`reconciler`] | [`SessionReconciler`]: initialize, login, update, wallet binding, logout |
//! | [`models`] | [`UserRecord`] and the partial shapes merged into it |
//! | [`config`] | [`SessionConfig`], TOML and layered environment loading |
//! | [`wallet`] | The wallet-provider port and its events |
//! | [`events`] | Signals for the UI layer |
//! | [`referral`] | Referral code generation |
//! | [`location`] | Route and `ref` parameter parsing |
//! | [`clock`] | Join-date time source |
//!
//! Storage goes through [`store::KeyValueStore`]; [`make_session`] picks the
//! backends for the current platform.

pub mod clock;
pub mod config;
mod error;
pub mod events;
pub mod location;
pub mod models;
mod platform;
pub mod reconciler;
pub mod referral;
pub mod wallet;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DisconnectFailurePolicy, SessionConfig};
pub use error::SessionError;
pub use events::{AuthMode, Notice, SessionEvent};
pub use location::PageLocation;
pub use models::{LoginCandidate, UserPatch, UserRecord};
#[cfg(not(target_arch = "wasm32"))]
pub use platform::make_session_in;
pub use platform::make_session;
pub use reconciler::SessionReconciler;
pub use wallet::{
    current_wallet_event, next_wallet_event, NoWallet, WalletConnector, WalletError, WalletEvent,
    WalletHandle,
};
