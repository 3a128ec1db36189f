//! Signals from the reconciler to the UI layer.
//!
//! Operations queue [`SessionEvent`]s; the UI drains them with
//! [`SessionReconciler::take_events`](crate::SessionReconciler::take_events)
//! after each call and reacts (show a modal, pop a toast, navigate).

use serde::{Deserialize, Serialize};

/// Which form the auth dialog shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Login,
    Signup,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// First visit to the landing page with no profile.
    ShowOnboarding,
    /// A wallet connect logged the user in; hide the onboarding prompt.
    OnboardingDismissed,
    /// Login or signup finished; close auth dialogs.
    AuthComplete,
    /// A new account was created from a referral link.
    ReferralSucceeded {
        referral_code: String,
        bonus_mints: u32,
    },
    LoggedOut,
}

/// Transient message for the UI to display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl SessionEvent {
    /// Toast text for events that warrant one.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            SessionEvent::ReferralSucceeded { bonus_mints, .. } => Some(Notice {
                title: "Referral Success! 🎉".to_string(),
                description: format!(
                    "Your friend has joined! The sender has been credited with {bonus_mints} bonus mints."
                ),
            }),
            _ => None,
        }
    }
}
