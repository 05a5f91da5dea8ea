//! Per-terminal session state.
//!
//! A [`Session`] lives as long as its controller. It is reset, not dropped,
//! when the card comes out.

use crate::types::{AccountId, CardId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session is in the card → PIN → account sequence.
///
/// Derived from the [`Session`] fields, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStage {
    /// Reader is empty
    NoCard,
    /// Card read, PIN not (yet) verified
    CardInserted,
    /// PIN verified, no account chosen
    Authenticated,
    /// Ready for transactions
    AccountSelected,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoCard => "no-card",
            Self::CardInserted => "card-inserted",
            Self::Authenticated => "authenticated",
            Self::AccountSelected => "account-selected",
        };
        f.write_str(name)
    }
}

/// Mutable session state owned by the controller.
///
/// Fields are private; the transition methods keep
/// `selected_account ⇒ authenticated ⇒ card` true at all times.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    card_id: Option<CardId>,
    authenticated: bool,
    selected_account: Option<AccountId>,
    card_inserted_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Card currently in the reader
    #[must_use]
    pub const fn card_id(&self) -> Option<&CardId> {
        self.card_id.as_ref()
    }

    /// Whether the PIN has been verified for the current card
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Account chosen for transactions
    #[must_use]
    pub const fn selected_account(&self) -> Option<&AccountId> {
        self.selected_account.as_ref()
    }

    /// When the current card was inserted
    #[must_use]
    pub const fn card_inserted_at(&self) -> Option<DateTime<Utc>> {
        self.card_inserted_at
    }

    /// Current stage
    #[must_use]
    pub const fn stage(&self) -> SessionStage {
        if self.selected_account.is_some() {
            SessionStage::AccountSelected
        } else if self.authenticated {
            SessionStage::Authenticated
        } else if self.card_id.is_some() {
            SessionStage::CardInserted
        } else {
            SessionStage::NoCard
        }
    }

    /// Checks the field invariants.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        let auth_ok = !self.authenticated || self.card_id.is_some();
        let account_ok = self.selected_account.is_none() || self.authenticated;
        auth_ok && account_ok
    }

    /// A new card voids any prior authorization.
    pub fn begin(&mut self, card_id: CardId, at: DateTime<Utc>) {
        self.card_id = Some(card_id);
        self.authenticated = false;
        self.selected_account = None;
        self.card_inserted_at = Some(at);
    }

    /// Records the outcome of a PIN check.
    ///
    /// A failed check also drops any selected account. Ignored with no card.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        if self.card_id.is_none() {
            return;
        }
        self.authenticated = authenticated;
        if !authenticated {
            self.selected_account = None;
        }
    }

    /// Selects `account`. Ignored unless authenticated.
    pub fn select_account(&mut self, account: AccountId) {
        if self.authenticated {
            self.selected_account = Some(account);
        }
    }

    /// Clears every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Serializable copy for logs and diagnostics
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.stage(),
            card_id: self.card_id.clone(),
            authenticated: self.authenticated,
            selected_account: self.selected_account.clone(),
            card_inserted_at: self.card_inserted_at,
        }
    }
}

/// Point-in-time copy of a [`Session`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Derived stage
    pub stage: SessionStage,
    /// Card in the reader
    pub card_id: Option<CardId>,
    /// PIN verified
    pub authenticated: bool,
    /// Account chosen
    pub selected_account: Option<AccountId>,
    /// Insertion time of the current card
    pub card_inserted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn new_session_is_empty() {
        let session = Session::new();
        assert_eq!(session.stage(), SessionStage::NoCard);
        assert!(session.card_id().is_none());
        assert!(!session.is_authenticated());
        assert!(session.selected_account().is_none());
        assert!(session.is_consistent());
    }

    #[test]
    fn stages_follow_the_sequence() {
        let mut session = Session::new();
        session.begin(CardId::new("CARD-1234"), at());
        assert_eq!(session.stage(), SessionStage::CardInserted);
        assert_eq!(session.card_inserted_at(), Some(at()));

        session.set_authenticated(true);
        assert_eq!(session.stage(), SessionStage::Authenticated);

        session.select_account(AccountId::new("ACC-111"));
        assert_eq!(session.stage(), SessionStage::AccountSelected);

        session.clear();
        assert_eq!(session, Session::new());
    }

    #[test]
    fn begin_voids_prior_authorization() {
        let mut session = Session::new();
        session.begin(CardId::new("CARD-1"), at());
        session.set_authenticated(true);
        session.select_account(AccountId::new("ACC-1"));

        session.begin(CardId::new("CARD-2"), at());
        assert_eq!(session.card_id(), Some(&CardId::new("CARD-2")));
        assert!(!session.is_authenticated());
        assert!(session.selected_account().is_none());
    }

    #[test]
    fn failed_pin_drops_selected_account() {
        let mut session = Session::new();
        session.begin(CardId::new("CARD-1"), at());
        session.set_authenticated(true);
        session.select_account(AccountId::new("ACC-1"));

        session.set_authenticated(false);
        assert_eq!(session.stage(), SessionStage::CardInserted);
        assert!(session.is_consistent());
    }

    #[test]
    fn guards_ignore_out_of_order_transitions() {
        let mut session = Session::new();
        session.set_authenticated(true);
        assert!(!session.is_authenticated());

        session.begin(CardId::new("CARD-1"), at());
        session.select_account(AccountId::new("ACC-1"));
        assert!(session.selected_account().is_none());
    }

    #[test]
    fn snapshot_serializes_stage_and_fields() {
        let mut session = Session::new();
        session.begin(CardId::new("CARD-1234"), at());
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["stage"], "CardInserted");
        assert_eq!(json["card_id"], "CARD-1234");
        assert_eq!(json["authenticated"], false);
        assert!(json["selected_account"].is_null());
    }

    #[derive(Clone, Debug)]
    enum Step {
        Begin,
        Auth(bool),
        Select,
        Clear,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Begin),
            any::<bool>().prop_map(Step::Auth),
            Just(Step::Select),
            Just(Step::Clear),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_transition_sequence(steps in prop::collection::vec(step(), 0..40)) {
            let mut session = Session::new();
            for step in steps {
                match step {
                    Step::Begin => session.begin(CardId::new("CARD"), at()),
                    Step::Auth(ok) => session.set_authenticated(ok),
                    Step::Select => session.select_account(AccountId::new("ACC")),
                    Step::Clear => session.clear(),
                }
                prop_assert!(session.is_consistent());
            }
        }
    }
}
