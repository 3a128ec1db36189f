//! # Wallet-connection port
//!
//! The wallet provider (browser extension, embedded wallet, WalletConnect) is
//! an external collaborator. The reconciler needs exactly two things from it:
//! the handle of the active wallet, so logout can disconnect it, and a feed of
//! account changes, delivered as [`WalletEvent`]s.
//!
//! Providers that publish the active account on a `tokio::sync::watch`
//! channel can be read with [`current_wallet_event`] and
//! [`next_wallet_event`]. Neither borrows the reconciler, so the caller's
//! loop can hand each event to
//! [`SessionReconciler::handle_wallet_event`](crate::SessionReconciler::handle_wallet_event)
//! and still run logins, edits and logout between account changes.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// A connected wallet as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletHandle {
    /// Provider id, e.g. `"io.metamask"`.
    pub wallet_id: String,
    pub address: Option<String>,
}

impl WalletHandle {
    pub fn new(wallet_id: impl Into<String>, address: Option<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            address,
        }
    }
}

/// Change of the provider's active account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    Connected(String),
    Disconnected,
}

impl From<Option<String>> for WalletEvent {
    fn from(account: Option<String>) -> Self {
        match account {
            Some(address) if !address.is_empty() => WalletEvent::Connected(address),
            _ => WalletEvent::Disconnected,
        }
    }
}

/// The account currently published on `accounts`, marked as seen.
pub fn current_wallet_event(accounts: &mut watch::Receiver<Option<String>>) -> WalletEvent {
    WalletEvent::from(accounts.borrow_and_update().clone())
}

/// Wait for the next account change on `accounts`.
///
/// `None` once the sender is gone and every published value was seen.
pub async fn next_wallet_event(
    accounts: &mut watch::Receiver<Option<String>>,
) -> Option<WalletEvent> {
    if accounts.changed().await.is_err() {
        debug!("wallet account feed closed");
        return None;
    }
    Some(current_wallet_event(accounts))
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet '{wallet_id}' rejected disconnect: {reason}")]
    Rejected { wallet_id: String, reason: String },

    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),
}

/// Async interface to the wallet provider.
pub trait WalletConnector {
    /// The currently connected wallet, if any.
    fn active_wallet(&self) -> Option<WalletHandle>;

    /// Disconnect `wallet`. May take arbitrarily long.
    fn disconnect(
        &self,
        wallet: &WalletHandle,
    ) -> impl Future<Output = Result<(), WalletError>>;
}

/// Connector for environments with no wallet provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWallet;

impl WalletConnector for NoWallet {
    fn active_wallet(&self) -> Option<WalletHandle> {
        None
    }

    async fn disconnect(&self, _wallet: &WalletHandle) -> Result<(), WalletError> {
        Ok(())
    }
}

/// Run `fut`, giving up after `limit`. `None` waits indefinitely.
///
/// Natively this needs a tokio runtime with the time driver enabled.
pub(crate) async fn within<F: Future>(fut: F, limit: Option<Duration>) -> Option<F::Output> {
    let Some(limit) = limit else {
        return Some(fut.await);
    };

    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::time::timeout(limit, fut).await.ok()
    }
    #[cfg(target_arch = "wasm32")]
    {
        use futures::future::{select, Either};

        let sleep = gloo_timers::future::sleep(limit);
        futures::pin_mut!(fut, sleep);
        match select(fut, sleep).await {
            Either::Left((output, _)) => Some(output),
            Either::Right(_) => None,
        }
    }
}
