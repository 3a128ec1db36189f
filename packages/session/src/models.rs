//! # Profile models
//!
//! The JSON stored under the durable profile key is a [`UserRecord`]. Its keys
//! are camelCase (`walletAddress`, `mintsRemaining`, ...) and any keys this
//! crate does not know about are carried along in [`UserRecord::extra`], so a
//! profile written by another version of the front-end survives a round trip.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`UserRecord`] | The full profile of the logged-in user. |
//! | [`LoginCandidate`] | What a login, signup, or wallet connect knows about a user. Only `id` is required. |
//! | [`UserPatch`] | A partial update of display fields. Identity fields cannot be expressed. |
//! | [`NewIdentity`] | The identity fields resolved for a brand-new record. |
//!
//! ## Identity fields
//!
//! `id`, `referralCode`, `joinDate`, `referredBy` and `mintsRemaining` are
//! fixed when a record is created. Merges ([`UserPatch::apply`],
//! [`UserRecord::merge_candidate`]) only ever touch `name`, `email`,
//! `walletAddress` and extra keys, and they never clear a field the patch did
//! not mention.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Domain used for the placeholder e-mail of wallet-only accounts.
pub const WALLET_EMAIL_DOMAIN: &str = "herichain.io";

/// JSON keys owned by named fields; never accepted as extra keys.
const RESERVED_KEYS: [&str; 8] = [
    "id",
    "name",
    "email",
    "walletAddress",
    "joinDate",
    "referralCode",
    "referredBy",
    "mintsRemaining",
];

/// Profile of a user, as persisted in the durable store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Wallet address or account id
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// ISO-8601 UTC timestamp of account creation
    #[serde(default, deserialize_with = "null_as_default")]
    pub join_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub referral_code: String,
    /// Referral code presented when the account was created
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mints_remaining: u32,
    /// Keys written by other parts of the front-end
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Whether this record is bound to `address`.
    pub fn has_wallet(&self, address: &str) -> bool {
        self.wallet_address.as_deref() == Some(address)
    }

    /// Merge a login candidate for the same user onto this record.
    ///
    /// Candidate display fields win; identity fields stay as they are.
    pub fn merge_candidate(mut self, candidate: LoginCandidate) -> Self {
        candidate.into_patch().apply(&mut self);
        self
    }
}

/// Partial update of a [`UserRecord`]'s display fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserPatch {
    /// Patch that binds a wallet address.
    pub fn wallet(address: impl Into<String>) -> Self {
        Self {
            wallet_address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set an extra key. Reserved keys are dropped when the patch is applied.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.wallet_address.is_none()
            && self.extra.is_empty()
    }

    /// Shallow-merge onto `record`. Fields absent from the patch are kept.
    pub fn apply(self, record: &mut UserRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(address) = self.wallet_address {
            record.wallet_address = Some(address);
        }
        merge_extra(&mut record.extra, self.extra);
    }
}

/// What is known about a user at login time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCandidate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            wallet_address: None,
            join_date: None,
            referral_code: None,
            extra: Map::new(),
        }
    }

    /// Placeholder identity for a wallet that connects with no profile.
    ///
    /// The name is the first six characters of the address and the e-mail is
    /// derived from it.
    pub fn for_wallet(address: &str, join_date: impl Into<String>) -> Self {
        let short: String = address.chars().take(6).collect();
        Self {
            id: address.to_string(),
            email: Some(format!("wallet-user-{short}@{WALLET_EMAIL_DOMAIN}")),
            name: Some(short),
            wallet_address: Some(address.to_string()),
            join_date: Some(join_date.into()),
            referral_code: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_wallet_address(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = Some(address.into());
        self
    }

    pub fn with_referral_code(mut self, code: impl Into<String>) -> Self {
        self.referral_code = Some(code.into());
        self
    }

    pub fn with_join_date(mut self, join_date: impl Into<String>) -> Self {
        self.join_date = Some(join_date.into());
        self
    }

    /// The display part of the candidate, dropping identity fields.
    pub fn into_patch(self) -> UserPatch {
        UserPatch {
            name: self.name,
            email: self.email,
            wallet_address: self.wallet_address,
            extra: self.extra,
        }
    }

    /// Build a brand-new record. The candidate's own `referral_code` and
    /// `join_date` must already be folded into `identity`.
    pub fn into_new_record(self, identity: NewIdentity) -> UserRecord {
        let mut extra = Map::new();
        merge_extra(&mut extra, self.extra);
        UserRecord {
            id: self.id,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            wallet_address: self.wallet_address,
            join_date: identity.join_date,
            referral_code: identity.referral_code,
            referred_by: identity.referred_by,
            mints_remaining: identity.mints_remaining,
            extra,
        }
    }
}

/// Identity fields fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewIdentity {
    pub referral_code: String,
    pub join_date: String,
    pub referred_by: Option<String>,
    pub mints_remaining: u32,
}

/// Read `null` as the type's default; profiles written by older clients carry
/// explicit nulls.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn merge_extra(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        if RESERVED_KEYS.contains(&key.as_str()) {
            tracing::debug!(key = %key, "ignoring reserved key in profile update");
            continue;
        }
        target.insert(key, value);
    }
}
