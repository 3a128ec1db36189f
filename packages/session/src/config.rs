//! # Session configuration — `herichain.toml`
//!
//! Everything the reconciler would otherwise hard-code: storage key names, the
//! referral code prefix and bonus, the initial mint allowance, how logout
//! behaves when the wallet refuses to disconnect, and the chain/contract
//! settings the wallet provider is configured with.
//!
//! ## Structure
//!
//! ```toml
//! [storage]
//! user_key = "herichain_user"
//! seen_onboarding_key = "herichain_has_seen_modal"
//! referral_key = "referralCode"
//!
//! [referral]
//! code_prefix = "herichain"
//! referrer_bonus_mints = 30
//!
//! [mints]
//! initial_allowance = 10
//!
//! [logout]
//! disconnect_timeout_ms = 0              # 0 waits indefinitely
//! on_disconnect_failure = "clear-local"  # or "abort"
//!
//! [chain]
//! name = "polygon-amoy"
//! chain_id = 80002
//! ```
//!
//! All structs derive or implement `Default` so that a missing or empty config
//! file is equivalent to the default configuration.
//!
//! On native targets [`SessionConfig::load`] layers an optional TOML file and
//! `HERICHAIN__<SECTION>__<KEY>` environment variables over those defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration stored in `herichain.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub mints: MintsConfig,
    #[serde(default)]
    pub logout: LogoutConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

/// Key names in the durable and ephemeral stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable key holding the JSON profile.
    pub user_key: String,
    /// Ephemeral key set once the onboarding prompt was dismissed.
    pub seen_onboarding_key: String,
    /// Ephemeral key holding a referral code captured from the URL.
    pub referral_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            user_key: "herichain_user".into(),
            seen_onboarding_key: "herichain_has_seen_modal".into(),
            referral_key: "referralCode".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralConfig {
    /// Generated codes look like `<prefix>-1a2b3c4d`.
    pub code_prefix: String,
    /// Mints the referrer is owed per successful referral. Reported, not applied.
    pub referrer_bonus_mints: u32,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            code_prefix: "herichain".into(),
            referrer_bonus_mints: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintsConfig {
    /// Mints granted to every new account.
    pub initial_allowance: u32,
}

impl Default for MintsConfig {
    fn default() -> Self {
        Self {
            initial_allowance: 10,
        }
    }
}

/// What logout does when the wallet disconnect fails or times out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisconnectFailurePolicy {
    /// Log the failure and clear the local session anyway.
    #[default]
    ClearLocal,
    /// Keep the local session and return the error.
    Abort,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutConfig {
    /// Upper bound on the wallet disconnect. 0 waits indefinitely.
    pub disconnect_timeout_ms: u64,
    pub on_disconnect_failure: DisconnectFailurePolicy,
}

impl LogoutConfig {
    pub fn disconnect_timeout(&self) -> Option<Duration> {
        (self.disconnect_timeout_ms > 0).then(|| Duration::from_millis(self.disconnect_timeout_ms))
    }
}

/// Chain and contract settings handed to the wallet provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Wallet-provider client id.
    pub client_id: String,
    pub nft_contract_address: String,
    pub marketplace_contract_address: String,
    /// Backend wallet that sponsors gasless transactions.
    pub gasless_sponsor_address: String,
    /// Wallet ids offered in the connect dialog, in display order.
    pub wallets: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "polygon-amoy".into(),
            chain_id: 80002,
            rpc_url: "https://80002.rpc.thirdweb.com".into(),
            client_id: String::new(),
            nft_contract_address: String::new(),
            marketplace_contract_address: String::new(),
            gasless_sponsor_address: String::new(),
            wallets: [
                "inApp",
                "io.metamask",
                "com.coinbase.wallet",
                "walletConnect",
                "com.trustwallet.app",
                "me.rainbow",
                "app.phantom",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl SessionConfig {
    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "herichain.toml"
    }

    /// Builder method to set the logout disconnect timeout.
    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.logout.disconnect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builder method to set the logout failure policy.
    pub fn with_disconnect_policy(mut self, policy: DisconnectFailurePolicy) -> Self {
        self.logout.on_disconnect_failure = policy;
        self
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Layered load: defaults, then the TOML file at `path` (or
    /// [`filename`](Self::filename) in the working directory) if it exists,
    /// then `HERICHAIN__*` environment variables.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File, FileFormat};

        let file = path
            .map(std::path::Path::to_path_buf)
            .unwrap_or_else(|| std::path::PathBuf::from(Self::filename()));

        Config::builder()
            .add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("HERICHAIN")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
