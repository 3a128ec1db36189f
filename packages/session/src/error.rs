use std::time::Duration;

use store::StoreError;
use thiserror::Error;

use crate::wallet::WalletError;

/// Errors returned by [`crate::SessionReconciler`] operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// A profile operation was attempted while logged out.
    #[error("no user is logged in")]
    NoCurrentUser,

    #[error("cannot consume {requested} mints with {remaining} remaining")]
    InsufficientMints { requested: u32, remaining: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize user record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("wallet disconnect failed: {0}")]
    WalletDisconnect(#[from] WalletError),

    #[error("wallet disconnect did not finish within {0:?}")]
    DisconnectTimedOut(Duration),

    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SessionError {
    pub fn is_no_current_user(&self) -> bool {
        matches!(self, SessionError::NoCurrentUser)
    }

    /// Whether the error came from the wallet provider during logout.
    pub fn is_wallet_error(&self) -> bool {
        matches!(
            self,
            SessionError::WalletDisconnect(_) | SessionError::DisconnectTimedOut(_)
        )
    }
}
