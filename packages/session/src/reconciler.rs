//! # SessionReconciler — who is logged in, and what is stored about them
//!
//! [`SessionReconciler`] owns the current [`UserRecord`] and is the only writer
//! of the durable profile store and the ephemeral session store. Everything
//! that can change the session goes through it: page load, login/signup forms,
//! wallet account changes, profile edits, and logout.
//!
//! ## States
//!
//! Logged out (`current_user() == None`) or logged in. `login` and
//! `bind_wallet` log in; `logout` logs out; `update_user`, `consume_mints`
//! and `bind_wallet` for the current user keep the session logged in.
//!
//! ## New vs returning users
//!
//! `login` looks the candidate's `id` up in the durable store. No stored
//! profile, an unreadable one, or one for a different `id` means a new
//! account: a referral code is generated unless supplied, the mint allowance
//! is granted, and `referredBy` is taken from the ephemeral referral slot.
//! Otherwise the candidate's display fields are merged onto the stored
//! profile and its identity fields are kept.
//!
//! ## UI signals
//!
//! Operations queue [`SessionEvent`]s and keep two pieces of prompt state
//! (the onboarding prompt and the auth dialog mode). The UI reads both after
//! each call.

use std::sync::Arc;

use store::KeyValueStore;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DisconnectFailurePolicy, SessionConfig};
use crate::error::SessionError;
use crate::events::{AuthMode, SessionEvent};
use crate::location::{is_root_route, PageLocation};
use crate::models::{LoginCandidate, NewIdentity, UserPatch, UserRecord};
use crate::referral::generate_referral_code;
use crate::wallet::{within, WalletConnector, WalletEvent};

const SEEN_FLAG: &str = "true";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Prompts {
    onboarding: bool,
    auth: Option<AuthMode>,
}

/// Reconciles wallet, form, and storage input into one current user.
pub struct SessionReconciler<D, E, W> {
    durable: D,
    ephemeral: E,
    wallet: W,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    current_user: Option<UserRecord>,
    prompts: Prompts,
    events: Vec<SessionEvent>,
}

impl<D, E, W> SessionReconciler<D, E, W>
where
    D: KeyValueStore,
    E: KeyValueStore,
    W: WalletConnector,
{
    /// Create a logged-out reconciler. Call [`initialize`](Self::initialize)
    /// on page load to restore a stored session.
    pub fn new(durable: D, ephemeral: E, wallet: W, config: SessionConfig) -> Self {
        Self {
            durable,
            ephemeral,
            wallet,
            clock: Arc::new(SystemClock),
            config,
            current_user: None,
            prompts: Prompts::default(),
            events: Vec::new(),
        }
    }

    /// Replace the clock used for join dates.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn current_user(&self) -> Option<&UserRecord> {
        self.current_user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    /// Whether the onboarding prompt is raised.
    pub fn show_onboarding(&self) -> bool {
        self.prompts.onboarding
    }

    /// Whether the onboarding prompt should render on `route`.
    pub fn onboarding_visible_at(&self, route: &str) -> bool {
        self.prompts.onboarding && is_root_route(route)
    }

    /// Mode of the open auth dialog, if any.
    pub fn auth_mode(&self) -> Option<AuthMode> {
        self.prompts.auth
    }

    /// Referral code waiting to be attached to the next new account.
    pub fn pending_referral(&self) -> Option<String> {
        self.ephemeral
            .get(&self.config.storage.referral_key)
            .filter(|code| !code.is_empty())
    }

    /// Drain queued UI signals.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Page-load reconciliation.
    ///
    /// Captures `referral_param` into the ephemeral slot, restores a stored
    /// profile, or raises the onboarding prompt for a first visit to the root
    /// route. Never fails; storage problems are logged.
    pub fn initialize(&mut self, referral_param: Option<&str>, route: &str) {
        if let Some(code) = referral_param.filter(|code| !code.is_empty()) {
            match self.ephemeral.set(&self.config.storage.referral_key, code) {
                Ok(()) => debug!(referral_code = code, "captured referral code"),
                Err(error) => warn!(%error, "failed to store referral code"),
            }
        }

        if let Some(user) = self.load_persisted() {
            debug!(user_id = %user.id, "restored stored session");
            self.current_user = Some(user);
        } else if !self.ephemeral.contains(&self.config.storage.seen_onboarding_key)
            && is_root_route(route)
            && !self.prompts.onboarding
        {
            self.prompts.onboarding = true;
            self.events.push(SessionEvent::ShowOnboarding);
        }
    }

    /// [`initialize`](Self::initialize) from a full page URL or `/path?query`.
    pub fn initialize_from_url(&mut self, url: &str) -> Result<PageLocation, SessionError> {
        let location = PageLocation::parse(url)?;
        self.initialize(location.referral.as_deref(), &location.path);
        Ok(location)
    }

    /// Log in or sign up `candidate`, creating the profile if it is new.
    pub fn login(&mut self, candidate: LoginCandidate) -> Result<UserRecord, SessionError> {
        let referral = self.pending_referral();
        let existing = self
            .load_persisted()
            .filter(|stored| stored.id == candidate.id);

        let (user, referred_by) = match existing {
            Some(stored) => {
                info!(user_id = %stored.id, "returning user logged in");
                (stored.merge_candidate(candidate), None)
            }
            None => {
                let user = self.new_record(candidate, referral.clone());
                info!(
                    user_id = %user.id,
                    referral_code = %user.referral_code,
                    referred = referral.is_some(),
                    "new user created"
                );
                (user, referral)
            }
        };

        self.persist(&user)?;
        if let Err(error) = self.ephemeral.remove(&self.config.storage.referral_key) {
            warn!(%error, "failed to clear referral code");
        }

        if let Some(referral_code) = referred_by {
            let bonus_mints = self.config.referral.referrer_bonus_mints;
            info!(
                %referral_code,
                bonus_mints,
                "referral successful; referrer should be credited"
            );
            self.events.push(SessionEvent::ReferralSucceeded {
                referral_code,
                bonus_mints,
            });
        }

        self.current_user = Some(user.clone());
        self.prompts = Prompts::default();
        self.events.push(SessionEvent::AuthComplete);
        Ok(user)
    }

    /// Shallow-merge `patch` onto the current user and persist it.
    pub fn update_user(&mut self, patch: UserPatch) -> Result<UserRecord, SessionError> {
        let mut updated = self
            .current_user
            .clone()
            .ok_or(SessionError::NoCurrentUser)?;
        patch.apply(&mut updated);
        self.persist(&updated)?;
        self.current_user = Some(updated.clone());
        Ok(updated)
    }

    /// Spend `count` of the current user's mints.
    pub fn consume_mints(&mut self, count: u32) -> Result<UserRecord, SessionError> {
        let mut updated = self
            .current_user
            .clone()
            .ok_or(SessionError::NoCurrentUser)?;
        updated.mints_remaining = updated
            .mints_remaining
            .checked_sub(count)
            .ok_or(SessionError::InsufficientMints {
                requested: count,
                remaining: updated.mints_remaining,
            })?;
        self.persist(&updated)?;
        debug!(user_id = %updated.id, remaining = updated.mints_remaining, "mints consumed");
        self.current_user = Some(updated.clone());
        Ok(updated)
    }

    /// React to the wallet provider reporting `address` as the active account.
    ///
    /// Binds the address to the current user, or logs in a placeholder
    /// account for it when nobody is logged in.
    pub fn bind_wallet(&mut self, address: &str) -> Result<UserRecord, SessionError> {
        match self.current_user.as_ref().map(|user| user.has_wallet(address)) {
            Some(true) => self.current_user.clone().ok_or(SessionError::NoCurrentUser),
            Some(false) => {
                debug!(wallet = address, "binding wallet to current user");
                self.update_user(UserPatch::wallet(address))
            }
            None => {
                let candidate = LoginCandidate::for_wallet(address, self.clock.now_iso());
                let user = self.login(candidate)?;
                self.prompts.onboarding = false;
                self.events.push(SessionEvent::OnboardingDismissed);
                Ok(user)
            }
        }
    }

    /// Dispatch a wallet account change.
    pub fn handle_wallet_event(
        &mut self,
        event: WalletEvent,
    ) -> Result<Option<UserRecord>, SessionError> {
        match event {
            WalletEvent::Connected(address) if !address.is_empty() => {
                self.bind_wallet(&address).map(Some)
            }
            WalletEvent::Connected(_) | WalletEvent::Disconnected => {
                debug!("wallet disconnected; session unchanged");
                Ok(None)
            }
        }
    }

    /// Disconnect the active wallet, then forget the current user.
    ///
    /// A failed or timed-out disconnect is handled per
    /// [`DisconnectFailurePolicy`].
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(wallet) = self.wallet.active_wallet() {
            let limit = self.config.logout.disconnect_timeout();
            let outcome = match within(self.wallet.disconnect(&wallet), limit).await {
                Some(result) => result.map_err(SessionError::from),
                None => Err(SessionError::DisconnectTimedOut(limit.unwrap_or_default())),
            };

            if let Err(error) = outcome {
                match self.config.logout.on_disconnect_failure {
                    DisconnectFailurePolicy::Abort => {
                        warn!(%error, wallet = %wallet.wallet_id, "logout aborted");
                        return Err(error);
                    }
                    DisconnectFailurePolicy::ClearLocal => {
                        warn!(
                            %error,
                            wallet = %wallet.wallet_id,
                            "wallet disconnect failed; clearing local session anyway"
                        );
                    }
                }
            }
        }

        // Session stays intact if the stored profile cannot be removed
        self.durable.remove(&self.config.storage.user_key)?;
        let previous = self.current_user.take();
        self.prompts.auth = None;
        self.events.push(SessionEvent::LoggedOut);
        info!(user_id = ?previous.map(|user| user.id), "logged out");
        Ok(())
    }

    /// Hide the onboarding prompt for the rest of the browser session.
    pub fn dismiss_onboarding_prompt(&mut self) -> Result<(), SessionError> {
        self.prompts.onboarding = false;
        self.ephemeral
            .set(&self.config.storage.seen_onboarding_key, SEEN_FLAG)?;
        Ok(())
    }

    /// Open the auth dialog, replacing the onboarding prompt.
    pub fn open_auth(&mut self, mode: AuthMode) {
        self.prompts.auth = Some(mode);
        self.prompts.onboarding = false;
    }

    pub fn close_auth(&mut self) {
        self.prompts.auth = None;
    }

    fn load_persisted(&self) -> Option<UserRecord> {
        let raw = self.durable.get(&self.config.storage.user_key)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(error) => {
                warn!(%error, "ignoring unreadable stored profile");
                None
            }
        }
    }

    fn persist(&self, user: &UserRecord) -> Result<(), SessionError> {
        let json = serde_json::to_string(user)?;
        self.durable.set(&self.config.storage.user_key, &json)?;
        Ok(())
    }

    fn new_record(&self, candidate: LoginCandidate, referred_by: Option<String>) -> UserRecord {
        let referral_code = candidate
            .referral_code
            .clone()
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| generate_referral_code(&self.config.referral.code_prefix));
        let join_date = candidate
            .join_date
            .clone()
            .unwrap_or_else(|| self.clock.now_iso());
        candidate.into_new_record(NewIdentity {
            referral_code,
            join_date,
            referred_by,
            mints_remaining: self.config.mints.initial_allowance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::referral::is_generated_code;
    use crate::wallet::{
        current_wallet_event, next_wallet_event, NoWallet, WalletError, WalletHandle,
    };
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use store::{MemoryStore, StoreError};
    use tokio::sync::{mpsc, watch};

    const NOW: &str = "2025-10-19T08:30:00.000Z";

    /// How the test wallet answers a disconnect.
    #[derive(Clone, Copy, Debug)]
    enum Disconnect {
        Instant,
        Slow(Duration),
        Fail,
        Hang,
    }

    #[derive(Clone, Debug)]
    struct TestWallet {
        connected: bool,
        behaviour: Disconnect,
        calls: Rc<Cell<u32>>,
    }

    impl TestWallet {
        fn connected(behaviour: Disconnect) -> Self {
            Self {
                connected: true,
                behaviour,
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl WalletConnector for TestWallet {
        fn active_wallet(&self) -> Option<WalletHandle> {
            self.connected
                .then(|| WalletHandle::new("io.metamask", Some("0x9".to_string())))
        }

        async fn disconnect(&self, wallet: &WalletHandle) -> Result<(), WalletError> {
            self.calls.set(self.calls.get() + 1);
            match self.behaviour {
                Disconnect::Instant => Ok(()),
                Disconnect::Slow(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                Disconnect::Fail => Err(WalletError::Rejected {
                    wallet_id: wallet.wallet_id.clone(),
                    reason: "user closed the popup".to_string(),
                }),
                Disconnect::Hang => futures::future::pending().await,
            }
        }
    }

    struct Harness<W> {
        durable: MemoryStore,
        ephemeral: MemoryStore,
        session: SessionReconciler<MemoryStore, MemoryStore, W>,
    }

    fn harness_with<W: WalletConnector>(wallet: W, config: SessionConfig) -> Harness<W> {
        let durable = MemoryStore::new();
        let ephemeral = MemoryStore::new();
        let session = SessionReconciler::new(durable.clone(), ephemeral.clone(), wallet, config)
            .with_clock(Arc::new(FixedClock::from_millis(1_760_862_600_000)));
        Harness {
            durable,
            ephemeral,
            session,
        }
    }

    fn harness() -> Harness<NoWallet> {
        harness_with(NoWallet, SessionConfig::default())
    }

    fn stored_user(durable: &MemoryStore) -> Option<UserRecord> {
        durable
            .get("herichain_user")
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn seed_user(durable: &MemoryStore, id: &str) {
        let json = serde_json::json!({
            "id": id,
            "name": "alice",
            "email": "alice@example.com",
            "walletAddress": null,
            "joinDate": "2024-01-01T00:00:00.000Z",
            "referralCode": "herichain-AAA",
            "referredBy": null,
            "mintsRemaining": 7
        });
        durable.set("herichain_user", &json.to_string()).unwrap();
    }

    #[test]
    fn test_new_user_creation() {
        let mut h = harness();

        let user = h
            .session
            .login(LoginCandidate::new("0xABC").with_name("abc"))
            .unwrap();

        assert_eq!(user.id, "0xABC");
        assert_eq!(user.name, "abc");
        assert_eq!(user.mints_remaining, 10);
        assert!(is_generated_code(&user.referral_code, "herichain"));
        assert!(user.referred_by.is_none());
        assert_eq!(user.join_date, NOW);

        assert_eq!(stored_user(&h.durable), Some(user.clone()));
        assert_eq!(h.session.current_user(), Some(&user));
        assert_eq!(h.session.take_events(), vec![SessionEvent::AuthComplete]);
    }

    #[test]
    fn test_supplied_referral_code_is_kept() {
        let mut h = harness();
        let user = h
            .session
            .login(LoginCandidate::new("acct-1").with_referral_code("herichain-mine"))
            .unwrap();
        assert_eq!(user.referral_code, "herichain-mine");
    }

    #[test]
    fn test_empty_referral_code_is_generated() {
        let mut h = harness();
        let user = h
            .session
            .login(LoginCandidate::new("acct-1").with_referral_code(""))
            .unwrap();
        assert!(is_generated_code(&user.referral_code, "herichain"));
        assert_eq!(stored_user(&h.durable).unwrap().referral_code, user.referral_code);
    }

    #[test]
    fn test_referral_capture() {
        let mut h = harness();
        h.session
            .initialize_from_url("https://herichain.io/?ref=herichain-XYZ123")
            .unwrap();
        assert_eq!(
            h.ephemeral.get("referralCode").as_deref(),
            Some("herichain-XYZ123")
        );

        let user = h.session.login(LoginCandidate::new("0xDEF")).unwrap();

        assert_eq!(user.referred_by.as_deref(), Some("herichain-XYZ123"));
        assert!(h.ephemeral.get("referralCode").is_none());
        assert!(h.session.pending_referral().is_none());

        let events = h.session.take_events();
        assert!(events.contains(&SessionEvent::ReferralSucceeded {
            referral_code: "herichain-XYZ123".to_string(),
            bonus_mints: 30,
        }));
        assert_eq!(events.last(), Some(&SessionEvent::AuthComplete));
    }

    #[test]
    fn test_referral_overwrites_previous_capture() {
        let mut h = harness();
        h.session.initialize(Some("herichain-old"), "/");
        h.session.initialize(Some("herichain-new"), "/heirs");
        assert_eq!(h.session.pending_referral().as_deref(), Some("herichain-new"));

        // An empty parameter leaves the slot alone
        h.session.initialize(Some(""), "/");
        assert_eq!(h.session.pending_referral().as_deref(), Some("herichain-new"));
    }

    #[test]
    fn test_returning_user_merge_preserves_identity() {
        let mut h = harness();
        seed_user(&h.durable, "0xABC");

        let user = h
            .session
            .login(
                LoginCandidate::new("0xABC")
                    .with_wallet_address("0x1")
                    .with_join_date("2030-01-01T00:00:00.000Z"),
            )
            .unwrap();

        assert_eq!(user.referral_code, "herichain-AAA");
        assert_eq!(user.mints_remaining, 7);
        assert_eq!(user.wallet_address.as_deref(), Some("0x1"));
        assert_eq!(user.name, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.join_date, "2024-01-01T00:00:00.000Z");
        assert_eq!(stored_user(&h.durable), Some(user));
    }

    #[test]
    fn test_returning_user_ignores_referral() {
        let mut h = harness();
        seed_user(&h.durable, "0xABC");
        h.session.initialize(Some("herichain-XYZ123"), "/");

        let user = h.session.login(LoginCandidate::new("0xABC")).unwrap();

        assert!(user.referred_by.is_none());
        assert!(h.session.pending_referral().is_none());
        assert!(!h
            .session
            .take_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::ReferralSucceeded { .. })));
    }

    #[test]
    fn test_different_id_is_new_user() {
        let mut h = harness();
        seed_user(&h.durable, "0xABC");

        let user = h.session.login(LoginCandidate::new("0xOTHER")).unwrap();

        assert_eq!(user.mints_remaining, 10);
        assert_ne!(user.referral_code, "herichain-AAA");
        assert_eq!(stored_user(&h.durable).unwrap().id, "0xOTHER");
    }

    #[test]
    fn test_malformed_stored_profile_is_no_user() {
        let mut h = harness();
        h.durable.set("herichain_user", "{not json").unwrap();

        h.session.initialize(None, "/");
        assert!(h.session.current_user().is_none());
        assert!(h.session.show_onboarding());

        let user = h.session.login(LoginCandidate::new("0xABC")).unwrap();
        assert_eq!(user.mints_remaining, 10);
    }

    #[test]
    fn test_profile_with_null_fields_is_restored() {
        let mut h = harness();
        let json = serde_json::json!({
            "id": "0xABC",
            "name": null,
            "email": null,
            "walletAddress": null,
            "joinDate": null,
            "referralCode": "herichain-AAA",
            "referredBy": null,
            "mintsRemaining": 3
        });
        h.durable.set("herichain_user", &json.to_string()).unwrap();

        h.session.initialize(None, "/");
        let restored = h.session.current_user().unwrap();
        assert_eq!(restored.id, "0xABC");
        assert_eq!(restored.name, "");
        assert!(!h.session.show_onboarding());

        // Still a returning user: allowance and code survive
        let user = h.session.login(LoginCandidate::new("0xABC")).unwrap();
        assert_eq!(user.mints_remaining, 3);
        assert_eq!(user.referral_code, "herichain-AAA");
    }

    #[test]
    fn test_initialize_restores_session() {
        let mut h = harness();
        seed_user(&h.durable, "0xABC");

        h.session.initialize(None, "/");

        assert_eq!(h.session.current_user().unwrap().id, "0xABC");
        assert!(!h.session.show_onboarding());
        assert!(h.session.take_events().is_empty());
    }

    #[test]
    fn test_onboarding_only_on_root_and_first_visit() {
        let mut h = harness();
        h.session.initialize(None, "/marketplace");
        assert!(!h.session.show_onboarding());

        h.session.initialize(None, "/");
        assert!(h.session.show_onboarding());
        assert!(h.session.onboarding_visible_at("/"));
        assert!(!h.session.onboarding_visible_at("/heirs"));
        assert_eq!(h.session.take_events(), vec![SessionEvent::ShowOnboarding]);

        // Re-running on the same route does not raise it twice
        h.session.initialize(None, "/");
        assert!(h.session.take_events().is_empty());

        h.session.dismiss_onboarding_prompt().unwrap();
        assert!(!h.session.show_onboarding());
        assert_eq!(
            h.ephemeral.get("herichain_has_seen_modal").as_deref(),
            Some("true")
        );
        assert!(h.session.current_user().is_none());

        h.session.initialize(None, "/");
        assert!(!h.session.show_onboarding());
    }

    #[test]
    fn test_update_user_without_user() {
        let mut h = harness();
        let err = h.session.update_user(UserPatch::wallet("0x1")).unwrap_err();
        assert!(err.is_no_current_user());
        assert!(h.durable.is_empty());
    }

    #[test]
    fn test_update_user_is_idempotent() {
        let mut h = harness();
        h.session.login(LoginCandidate::new("0xABC")).unwrap();

        let once = h.session.update_user(UserPatch::default()).unwrap();
        let twice = h.session.update_user(UserPatch::default()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(stored_user(&h.durable), Some(twice));
    }

    #[test]
    fn test_update_user_merges_display_fields() {
        let mut h = harness();
        h.session.login(LoginCandidate::new("0xABC").with_email("a@b.c")).unwrap();

        let user = h
            .session
            .update_user(UserPatch::default().with_name("Alice"))
            .unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "a@b.c");
    }

    #[test]
    fn test_bind_wallet_existing_user() {
        let mut h = harness();
        seed_user(&h.durable, "acct-1");
        h.session.initialize(None, "/");
        let before = h.session.current_user().cloned().unwrap();

        let after = h.session.bind_wallet("0x9").unwrap();

        assert_eq!(after.wallet_address.as_deref(), Some("0x9"));
        assert_eq!(
            UserRecord {
                wallet_address: None,
                ..after.clone()
            },
            before
        );
        assert_eq!(stored_user(&h.durable), Some(after));
        // Not a login
        assert!(h.session.take_events().is_empty());
    }

    #[test]
    fn test_bind_same_wallet_is_noop() {
        let mut h = harness();
        h.session.bind_wallet("0x9").unwrap();
        h.session.take_events();

        let user = h.session.bind_wallet("0x9").unwrap();
        assert_eq!(user.id, "0x9");
        assert!(h.session.take_events().is_empty());
    }

    #[test]
    fn test_bind_wallet_without_user() {
        let mut h = harness();
        h.session.initialize(None, "/");
        assert!(h.session.show_onboarding());
        h.session.take_events();

        let user = h.session.bind_wallet("0x9f3a77c1").unwrap();

        assert_eq!(user.id, "0x9f3a77c1");
        assert_eq!(user.name, "0x9f3a");
        assert_eq!(user.email, "wallet-user-0x9f3a@herichain.io");
        assert_eq!(user.wallet_address.as_deref(), Some("0x9f3a77c1"));
        assert_eq!(user.mints_remaining, 10);
        assert_eq!(user.join_date, NOW);
        assert!(is_generated_code(&user.referral_code, "herichain"));

        assert!(!h.session.show_onboarding());
        // Dismissal by wallet connect is not remembered
        assert!(h.ephemeral.get("herichain_has_seen_modal").is_none());
        assert_eq!(
            h.session.take_events(),
            vec![SessionEvent::AuthComplete, SessionEvent::OnboardingDismissed]
        );
    }

    #[test]
    fn test_wallet_events() {
        let mut h = harness();
        assert_eq!(
            h.session.handle_wallet_event(WalletEvent::Disconnected).unwrap(),
            None
        );
        assert!(!h.session.is_logged_in());

        let user = h
            .session
            .handle_wallet_event(WalletEvent::Connected("0x9".to_string()))
            .unwrap();
        assert_eq!(user.unwrap().id, "0x9");

        // Disconnecting the wallet does not log out
        h.session.handle_wallet_event(WalletEvent::Disconnected).unwrap();
        assert!(h.session.is_logged_in());
    }

    #[test]
    fn test_consume_mints() {
        let mut h = harness();
        assert!(h.session.consume_mints(1).unwrap_err().is_no_current_user());

        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        let user = h.session.consume_mints(3).unwrap();
        assert_eq!(user.mints_remaining, 7);
        assert_eq!(stored_user(&h.durable).unwrap().mints_remaining, 7);

        let err = h.session.consume_mints(8).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InsufficientMints {
                requested: 8,
                remaining: 7
            }
        ));
        assert_eq!(h.session.current_user().unwrap().mints_remaining, 7);
    }

    #[test]
    fn test_auth_dialog() {
        let mut h = harness();
        h.session.initialize(None, "/");
        assert!(h.session.show_onboarding());

        h.session.open_auth(AuthMode::Signup);
        assert_eq!(h.session.auth_mode(), Some(AuthMode::Signup));
        assert!(!h.session.show_onboarding());

        h.session.open_auth(AuthMode::Login);
        assert_eq!(h.session.auth_mode(), Some(AuthMode::Login));

        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        assert_eq!(h.session.auth_mode(), None);

        h.session.open_auth(AuthMode::Login);
        h.session.close_auth();
        assert_eq!(h.session.auth_mode(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let wallet = TestWallet::connected(Disconnect::Instant);
        let calls = wallet.calls.clone();
        let mut h = harness_with(wallet, SessionConfig::default());
        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        h.session.take_events();

        h.session.logout().await.unwrap();

        assert_eq!(calls.get(), 1);
        assert!(h.session.current_user().is_none());
        assert!(h.durable.get("herichain_user").is_none());
        assert_eq!(h.session.take_events(), vec![SessionEvent::LoggedOut]);
    }

    #[tokio::test]
    async fn test_logout_waits_for_slow_disconnect() {
        let wallet = TestWallet::connected(Disconnect::Slow(Duration::from_millis(20)));
        let mut h = harness_with(wallet, SessionConfig::default());
        h.session.login(LoginCandidate::new("0xABC")).unwrap();

        h.session.logout().await.unwrap();

        assert!(h.session.current_user().is_none());
        assert!(h.durable.get("herichain_user").is_none());
    }

    #[tokio::test]
    async fn test_logout_without_wallet() {
        let mut h = harness();
        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        h.session.logout().await.unwrap();
        assert!(!h.session.is_logged_in());
        assert!(h.durable.is_empty());
    }

    #[tokio::test]
    async fn test_logout_failure_clears_by_default() {
        let wallet = TestWallet::connected(Disconnect::Fail);
        let mut h = harness_with(wallet, SessionConfig::default());
        h.session.login(LoginCandidate::new("0xABC")).unwrap();

        h.session.logout().await.unwrap();

        assert!(h.session.current_user().is_none());
        assert!(h.durable.get("herichain_user").is_none());
    }

    #[tokio::test]
    async fn test_logout_failure_can_abort() {
        let wallet = TestWallet::connected(Disconnect::Fail);
        let config =
            SessionConfig::default().with_disconnect_policy(DisconnectFailurePolicy::Abort);
        let mut h = harness_with(wallet, config);
        h.session.login(LoginCandidate::new("0xABC")).unwrap();

        let err = h.session.logout().await.unwrap_err();

        assert!(matches!(err, SessionError::WalletDisconnect(_)));
        assert!(err.is_wallet_error());
        assert_eq!(h.session.current_user().unwrap().id, "0xABC");
        assert!(h.durable.get("herichain_user").is_some());
    }

    #[tokio::test]
    async fn test_logout_timeout() {
        let config = SessionConfig::default().with_disconnect_timeout(Duration::from_millis(20));

        // Default policy clears after the timeout
        let mut h = harness_with(TestWallet::connected(Disconnect::Hang), config.clone());
        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        h.session.logout().await.unwrap();
        assert!(!h.session.is_logged_in());

        // Abort policy reports it
        let config = config.with_disconnect_policy(DisconnectFailurePolicy::Abort);
        let mut h = harness_with(TestWallet::connected(Disconnect::Hang), config);
        h.session.login(LoginCandidate::new("0xABC")).unwrap();
        let err = h.session.logout().await.unwrap_err();
        assert!(matches!(err, SessionError::DisconnectTimedOut(d) if d == Duration::from_millis(20)));
        assert!(h.session.is_logged_in());
    }

    /// Durable store whose removals are refused.
    #[derive(Clone, Default)]
    struct StuckStore(MemoryStore);

    impl KeyValueStore for StuckStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                key: key.to_string(),
                reason: "storage locked".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_logout_keeps_session_when_remove_fails() {
        let durable = StuckStore::default();
        let mut session = SessionReconciler::new(
            durable.clone(),
            MemoryStore::new(),
            NoWallet,
            SessionConfig::default(),
        )
        .with_clock(Arc::new(FixedClock::from_millis(1_760_862_600_000)));
        session.login(LoginCandidate::new("0xABC")).unwrap();
        session.open_auth(AuthMode::Login);
        session.take_events();

        let err = session.logout().await.unwrap_err();

        assert!(matches!(err, SessionError::Store(_)));
        assert_eq!(session.current_user().unwrap().id, "0xABC");
        assert_eq!(session.auth_mode(), Some(AuthMode::Login));
        assert!(durable.get("herichain_user").is_some());
        assert!(session.take_events().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_feed_handles_latest_account() {
        let mut h = harness();
        let (tx, mut rx) = watch::channel(None);
        tx.send(Some("0x9".to_string())).unwrap();
        drop(tx);

        h.session.handle_wallet_event(current_wallet_event(&mut rx)).unwrap();
        while let Some(event) = next_wallet_event(&mut rx).await {
            h.session.handle_wallet_event(event).unwrap();
        }

        assert_eq!(h.session.current_user().unwrap().id, "0x9");
    }

    #[tokio::test]
    async fn test_wallet_feed_interleaves_with_profile_edits() {
        let mut h = harness();
        seed_user(&h.durable, "acct-1");
        h.session.initialize(None, "/");

        let (accounts_tx, mut accounts) = watch::channel(None::<String>);
        let (edits_tx, mut edits) = mpsc::unbounded_channel();
        accounts_tx.send(Some("0x1".to_string())).unwrap();
        edits_tx.send(UserPatch::default().with_name("Heir")).unwrap();
        drop(accounts_tx);
        drop(edits_tx);

        let mut feed_open = true;
        let mut edits_open = true;
        while feed_open || edits_open {
            tokio::select! {
                event = next_wallet_event(&mut accounts), if feed_open => match event {
                    Some(event) => {
                        h.session.handle_wallet_event(event).unwrap();
                    }
                    None => feed_open = false,
                },
                patch = edits.recv(), if edits_open => match patch {
                    Some(patch) => {
                        h.session.update_user(patch).unwrap();
                    }
                    None => edits_open = false,
                },
            }
        }

        let user = h.session.current_user().unwrap();
        assert_eq!(user.id, "acct-1");
        assert_eq!(user.name, "Heir");
        assert_eq!(user.wallet_address.as_deref(), Some("0x1"));
        assert_eq!(user.mints_remaining, 7);
        assert_eq!(stored_user(&h.durable), Some(user.clone()));
    }

    #[tokio::test]
    async fn test_wallet_feed_follows_changes() {
        let mut h = harness();
        seed_user(&h.durable, "acct-1");
        h.session.initialize(None, "/");

        let (tx, mut rx) = watch::channel(None::<String>);
        assert_eq!(current_wallet_event(&mut rx), WalletEvent::Disconnected);

        tx.send(Some("0x1".to_string())).unwrap();
        let event = next_wallet_event(&mut rx).await.unwrap();
        h.session.handle_wallet_event(event).unwrap();

        // The session stays usable between account changes
        h.session
            .update_user(UserPatch::default().with_name("Heir"))
            .unwrap();

        tx.send(Some("0x2".to_string())).unwrap();
        drop(tx);
        while let Some(event) = next_wallet_event(&mut rx).await {
            h.session.handle_wallet_event(event).unwrap();
        }

        let user = h.session.current_user().unwrap();
        assert_eq!(user.id, "acct-1");
        assert_eq!(user.name, "Heir");
        assert_eq!(user.wallet_address.as_deref(), Some("0x2"));
        assert_eq!(user.mints_remaining, 7);
    }
}
