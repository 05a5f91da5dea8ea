//! The session controller.
//!
//! Every operation checks its preconditions against the [`Session`] before
//! calling a collaborator. A refused operation leaves both the session and
//! the collaborators untouched.

use crate::environment::TerminalEnvironment;
use atm_core::error::{CollaboratorFailure, Result, SessionError};
use atm_core::session::{Session, SessionSnapshot, SessionStage};
use atm_core::types::{AccountId, Amount, CardId, Pin};

/// Drives one terminal session against the injected collaborators.
///
/// Operations take `&mut self`; a caller serving several requests has to
/// serialize access itself (e.g. behind a mutex).
///
/// # Example
///
/// ```
/// use atm_core::types::{AccountId, Amount, Pin};
/// use atm_runtime::SessionController;
/// use atm_testing::fixtures::ReferenceTerminal;
///
/// # fn main() -> Result<(), atm_core::SessionError> {
/// let terminal = ReferenceTerminal::new();
/// let mut atm = SessionController::new(terminal.environment());
///
/// atm.insert_card();
/// assert!(atm.enter_pin(&Pin::new("4321"))?);
/// atm.select_account(AccountId::new("ACC-111"))?;
/// atm.withdraw(Amount::new(70))?;
/// assert_eq!(atm.balance()?, Amount::new(30));
/// atm.eject_card();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionController {
    env: TerminalEnvironment,
    session: Session,
}

impl SessionController {
    /// Creates a controller with an empty session
    #[must_use]
    pub fn new(env: TerminalEnvironment) -> Self {
        Self {
            env,
            session: Session::new(),
        }
    }

    /// Current session state
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current stage of the session
    #[must_use]
    pub const fn stage(&self) -> SessionStage {
        self.session.stage()
    }

    /// Serializable copy of the session
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Injected collaborators
    #[must_use]
    pub const fn environment(&self) -> &TerminalEnvironment {
        &self.env
    }

    /// Reads the card in the slot and starts a fresh session for it.
    ///
    /// Any previous authentication or account selection is discarded.
    #[tracing::instrument(skip(self), name = "insert_card")]
    pub fn insert_card(&mut self) -> CardId {
        let card = self.env.reader.read_card();
        let now = self.env.clock.now();
        self.session.begin(card.clone(), now);
        tracing::debug!(card_id = %card, "Card inserted");
        card
    }

    /// Checks `pin` for the inserted card and records the outcome.
    ///
    /// A mismatch keeps the card in the reader so the customer can retry.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoCard`] if the reader is empty.
    #[tracing::instrument(skip(self, pin), name = "enter_pin")]
    pub fn enter_pin(&mut self, pin: &Pin) -> Result<bool> {
        let Some(card) = self.session.card_id() else {
            tracing::warn!("PIN entered with no card inserted");
            return Err(SessionError::NoCard);
        };

        let matched = self.env.ledger.validate_pin(card, pin);
        if matched {
            tracing::debug!(card_id = %card, "PIN accepted");
        } else {
            tracing::warn!(card_id = %card, "PIN rejected");
        }

        self.session.set_authenticated(matched);
        Ok(matched)
    }

    /// Chooses the account for subsequent transactions.
    ///
    /// The ledger is not consulted; an unknown account surfaces on the first
    /// balance inquiry or transaction.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] unless the PIN has been verified.
    #[tracing::instrument(
        skip(self, account),
        fields(account_id = %account),
        name = "select_account"
    )]
    pub fn select_account(&mut self, account: AccountId) -> Result<()> {
        if !self.session.is_authenticated() {
            tracing::warn!("Account selection before authentication");
            return Err(SessionError::NotAuthenticated);
        }

        self.session.select_account(account);
        tracing::debug!("Account selected");
        Ok(())
    }

    /// Balance of the selected account.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoAccountSelected`], or
    /// [`SessionError::AccountNotFound`] if the ledger does not know the
    /// account.
    #[tracing::instrument(skip(self), name = "balance")]
    pub fn balance(&self) -> Result<Amount> {
        let account = selected(&self.session)?;
        let balance = self.env.ledger.balance(account)?;
        tracing::debug!(account_id = %account, %balance, "Balance inquiry");
        Ok(balance)
    }

    /// Credits `amount` to the selected account.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoAccountSelected`], [`SessionError::InvalidAmount`]
    /// for a zero amount, [`SessionError::AccountNotFound`] for an unknown
    /// account.
    #[tracing::instrument(skip(self), name = "deposit")]
    pub fn deposit(&mut self, amount: Amount) -> Result<()> {
        let account = selected(&self.session)?;
        positive(amount)?;

        self.env.ledger.credit(account, amount)?;
        tracing::debug!(account_id = %account, "Deposit credited");
        Ok(())
    }

    /// Debits the selected account and dispenses `amount` in cash.
    ///
    /// Both the balance and the cash reserve are checked before anything is
    /// mutated. The ledger is debited first, then the cash is dispensed.
    ///
    /// # Errors
    ///
    /// Refused without side effects:
    /// [`SessionError::NoAccountSelected`], [`SessionError::InvalidAmount`],
    /// [`SessionError::AccountNotFound`],
    /// [`SessionError::InsufficientFunds`] when the balance is short,
    /// [`SessionError::InsufficientCash`] when the machine is short.
    ///
    /// Failed part-way, reported as [`SessionError::Collaborator`]:
    /// a debit rejected by the ledger (nothing dispensed), or a dispense
    /// failing after the debit ([`CollaboratorFailure::DispenseAfterDebit`],
    /// needs reconciliation).
    #[tracing::instrument(skip(self), name = "withdraw")]
    pub fn withdraw(&mut self, amount: Amount) -> Result<()> {
        let account = selected(&self.session)?;
        positive(amount)?;

        let available = self.env.ledger.balance(account)?;
        if amount > available {
            tracing::warn!(account_id = %account, %available, "Insufficient funds");
            return Err(SessionError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        if !self.env.cash.has_cash(amount) {
            tracing::warn!(account_id = %account, "Insufficient cash in machine");
            return Err(SessionError::InsufficientCash { requested: amount });
        }

        // Debit strictly before dispense.
        if let Err(error) = self.env.ledger.debit(account, amount) {
            tracing::error!(account_id = %account, %error, "Debit failed after checks passed");
            return Err(CollaboratorFailure::Ledger(error).into());
        }

        if let Err(source) = self.env.cash.dispense(amount) {
            tracing::error!(
                account_id = %account,
                error = %source,
                "Dispense failed after debit, reconciliation required"
            );
            return Err(CollaboratorFailure::DispenseAfterDebit {
                account: account.clone(),
                amount,
                source,
            }
            .into());
        }

        tracing::debug!(account_id = %account, "Cash dispensed");
        Ok(())
    }

    /// Releases the card and clears the session. Safe to repeat.
    #[tracing::instrument(skip(self), name = "eject_card")]
    pub fn eject_card(&mut self) {
        self.env.reader.eject_card();
        if let Some(card) = self.session.card_id() {
            tracing::debug!(card_id = %card, "Card ejected");
        }
        self.session.clear();
    }
}

fn selected(session: &Session) -> Result<&AccountId> {
    session.selected_account().ok_or_else(|| {
        tracing::warn!("Transaction with no account selected");
        SessionError::NoAccountSelected
    })
}

fn positive(amount: Amount) -> Result<()> {
    if amount.is_zero() {
        tracing::warn!("Rejected zero amount");
        return Err(SessionError::InvalidAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_core::environment::{CashStoreError, LedgerError};
    use atm_testing::{
        FixedCardReader, InMemoryCashStore, InMemoryLedger, assertions, test_clock,
    };
    use std::sync::Arc;

    struct Rig {
        ledger: Arc<InMemoryLedger>,
        cash: Arc<InMemoryCashStore>,
        reader: Arc<FixedCardReader>,
        atm: SessionController,
    }

    fn rig(balance: u64, reserve: u64) -> Rig {
        let ledger = Arc::new(
            InMemoryLedger::new()
                .with_card("CARD-1234", "4321")
                .with_account("ACC-111", balance),
        );
        let cash = Arc::new(InMemoryCashStore::new(reserve));
        let reader = Arc::new(FixedCardReader::new("CARD-1234"));
        let env = TerminalEnvironment::new(ledger.clone(), cash.clone(), reader.clone())
            .with_clock(Arc::new(test_clock()));
        Rig {
            ledger,
            cash,
            reader,
            atm: SessionController::new(env),
        }
    }

    fn selected_rig(balance: u64, reserve: u64) -> Rig {
        let mut rig = rig(balance, reserve);
        rig.atm.insert_card();
        assert!(rig.atm.enter_pin(&Pin::new("4321")).unwrap());
        rig.atm.select_account(AccountId::new("ACC-111")).unwrap();
        rig
    }

    fn acc() -> AccountId {
        AccountId::new("ACC-111")
    }

    #[test]
    fn insert_card_reads_and_stamps() {
        let mut rig = rig(100, 200);
        let card = rig.atm.insert_card();
        assert_eq!(card, CardId::new("CARD-1234"));
        assert_eq!(rig.atm.stage(), SessionStage::CardInserted);
        assert_eq!(
            rig.atm.session().card_inserted_at(),
            Some(test_clock().time())
        );
        assert_eq!(rig.reader.reads(), 1);
    }

    #[test]
    fn enter_pin_without_card_fails_without_touching_ledger() {
        let mut rig = rig(100, 200);
        assert_eq!(
            rig.atm.enter_pin(&Pin::new("4321")),
            Err(SessionError::NoCard)
        );
        assert_eq!(rig.ledger.pin_checks(), 0);
        assertions::assert_cleared(rig.atm.session());
    }

    #[test]
    fn wrong_pin_then_retry() {
        let mut rig = rig(100, 200);
        rig.atm.insert_card();
        assert_eq!(rig.atm.enter_pin(&Pin::new("0000")), Ok(false));
        assert_eq!(rig.atm.stage(), SessionStage::CardInserted);
        assert_eq!(rig.atm.enter_pin(&Pin::new("4321")), Ok(true));
        assert_eq!(rig.atm.stage(), SessionStage::Authenticated);
    }

    #[test]
    fn wrong_pin_after_selection_deauthenticates() {
        let mut rig = selected_rig(100, 200);
        assert_eq!(rig.atm.enter_pin(&Pin::new("9999")), Ok(false));
        assert_eq!(rig.atm.stage(), SessionStage::CardInserted);
        assert_eq!(rig.atm.balance(), Err(SessionError::NoAccountSelected));
    }

    #[test]
    fn select_account_requires_authentication() {
        let mut rig = rig(100, 200);
        assert_eq!(
            rig.atm.select_account(acc()),
            Err(SessionError::NotAuthenticated)
        );
        rig.atm.insert_card();
        assert_eq!(
            rig.atm.select_account(acc()),
            Err(SessionError::NotAuthenticated)
        );
        assert!(rig.atm.session().selected_account().is_none());
    }

    #[test]
    fn unknown_account_surfaces_on_balance() {
        let mut rig = rig(100, 200);
        rig.atm.insert_card();
        rig.atm.enter_pin(&Pin::new("4321")).unwrap();
        rig.atm.select_account(AccountId::new("ACC-404")).unwrap();
        assert_eq!(
            rig.atm.balance(),
            Err(SessionError::AccountNotFound(AccountId::new("ACC-404")))
        );
        assert_eq!(
            rig.atm.deposit(Amount::new(5)),
            Err(SessionError::AccountNotFound(AccountId::new("ACC-404")))
        );
        assert_eq!(
            rig.atm.withdraw(Amount::new(5)),
            Err(SessionError::AccountNotFound(AccountId::new("ACC-404")))
        );
        assert_eq!(rig.ledger.mutations(), 0);
        assert_eq!(rig.cash.reserve(), Amount::new(200));
        assert_eq!(rig.cash.dispensed(), Amount::ZERO);
    }

    #[test]
    fn transactions_require_selected_account() {
        let mut rig = rig(100, 200);
        rig.atm.insert_card();
        rig.atm.enter_pin(&Pin::new("4321")).unwrap();
        assert_eq!(rig.atm.balance(), Err(SessionError::NoAccountSelected));
        assert_eq!(
            rig.atm.deposit(Amount::new(10)),
            Err(SessionError::NoAccountSelected)
        );
        assert_eq!(
            rig.atm.withdraw(Amount::new(10)),
            Err(SessionError::NoAccountSelected)
        );
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(100)));
    }

    #[test]
    fn no_account_is_reported_before_invalid_amount() {
        let mut rig = rig(100, 200);
        assert_eq!(
            rig.atm.withdraw(Amount::ZERO),
            Err(SessionError::NoAccountSelected)
        );
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let mut rig = selected_rig(100, 200);
        assert_eq!(rig.atm.deposit(Amount::ZERO), Err(SessionError::InvalidAmount));
        assert_eq!(rig.atm.withdraw(Amount::ZERO), Err(SessionError::InvalidAmount));
        assert_eq!(rig.ledger.mutations(), 0);
        assert_eq!(rig.cash.dispensed(), Amount::ZERO);
    }

    #[test]
    fn withdraw_debits_then_dispenses() {
        let mut rig = selected_rig(100, 200);
        rig.atm.withdraw(Amount::new(70)).unwrap();
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(30)));
        assert_eq!(rig.cash.reserve(), Amount::new(130));
    }

    #[test]
    fn withdraw_exact_balance_is_allowed() {
        let mut rig = selected_rig(100, 200);
        rig.atm.withdraw(Amount::new(100)).unwrap();
        assert_eq!(rig.atm.balance(), Ok(Amount::ZERO));
    }

    #[test]
    fn withdraw_exact_reserve_is_allowed() {
        let mut rig = selected_rig(500, 200);
        rig.atm.withdraw(Amount::new(200)).unwrap();
        assert_eq!(rig.cash.reserve(), Amount::ZERO);
    }

    #[test]
    fn insufficient_funds_has_no_side_effects() {
        let mut rig = selected_rig(80, 200);
        assert_eq!(
            rig.atm.withdraw(Amount::new(81)),
            Err(SessionError::InsufficientFunds {
                requested: Amount::new(81),
                available: Amount::new(80),
            })
        );
        assert_eq!(rig.ledger.mutations(), 0);
        assert_eq!(rig.cash.reserve(), Amount::new(200));
    }

    #[test]
    fn insufficient_cash_has_no_side_effects() {
        let mut rig = selected_rig(1_000, 150);
        assert_eq!(
            rig.atm.withdraw(Amount::new(151)),
            Err(SessionError::InsufficientCash {
                requested: Amount::new(151)
            })
        );
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(1_000)));
        assert_eq!(rig.ledger.mutations(), 0);
        assert_eq!(rig.cash.reserve(), Amount::new(150));
    }

    #[test]
    fn balance_lookup_failure_stops_withdrawal() {
        let mut rig = selected_rig(100, 200);
        rig.ledger
            .fail_next_balance(LedgerError::Unavailable("link down".to_string()));

        let err = rig.atm.withdraw(Amount::new(50)).unwrap_err();
        assert_eq!(
            err,
            SessionError::Collaborator(CollaboratorFailure::Ledger(LedgerError::Unavailable(
                "link down".to_string()
            )))
        );
        assert!(!err.is_precondition());
        assert!(!err.requires_reconciliation());
        assert_eq!(rig.ledger.mutations(), 0);
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(100)));
        assert_eq!(rig.cash.reserve(), Amount::new(200));
        assert_eq!(rig.cash.dispensed(), Amount::ZERO);
        assert_eq!(rig.atm.stage(), SessionStage::AccountSelected);

        // Link back: the same withdrawal goes through
        rig.atm.withdraw(Amount::new(50)).unwrap();
        assert_eq!(rig.cash.reserve(), Amount::new(150));
    }

    #[test]
    fn debit_failure_stops_before_dispense() {
        let mut rig = selected_rig(100, 200);
        rig.ledger
            .fail_next_debit(LedgerError::Unavailable("link down".to_string()));

        let err = rig.atm.withdraw(Amount::new(50)).unwrap_err();
        assert_eq!(
            err,
            SessionError::Collaborator(CollaboratorFailure::Ledger(LedgerError::Unavailable(
                "link down".to_string()
            )))
        );
        assert!(!err.requires_reconciliation());
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(100)));
        assert_eq!(rig.cash.reserve(), Amount::new(200));
    }

    #[test]
    fn dispense_failure_after_debit_is_reported() {
        let mut rig = selected_rig(100, 200);
        rig.cash
            .fail_next_dispense(CashStoreError::Hardware("jammed".to_string()));

        let err = rig.atm.withdraw(Amount::new(50)).unwrap_err();
        assert!(err.requires_reconciliation());
        assert_eq!(
            err,
            SessionError::Collaborator(CollaboratorFailure::DispenseAfterDebit {
                account: acc(),
                amount: Amount::new(50),
                source: CashStoreError::Hardware("jammed".to_string()),
            })
        );
        assert_eq!(rig.ledger.balance_of(&acc()), Some(Amount::new(50)));
        assert_eq!(rig.cash.reserve(), Amount::new(200));
        assert_eq!(rig.atm.stage(), SessionStage::AccountSelected);
    }

    #[test]
    fn eject_is_idempotent() {
        let mut rig = selected_rig(100, 200);
        rig.atm.eject_card();
        assertions::assert_cleared(rig.atm.session());
        let first = rig.atm.snapshot();

        rig.atm.eject_card();
        assertions::assert_cleared(rig.atm.session());
        assert_eq!(rig.atm.snapshot(), first);
        assert_eq!(rig.reader.ejects(), 2);
    }

    #[test]
    fn reinserting_voids_authorization() {
        let mut rig = selected_rig(100, 200);
        rig.atm.insert_card();
        assert_eq!(rig.atm.stage(), SessionStage::CardInserted);
        assert_eq!(
            rig.atm.withdraw(Amount::new(10)),
            Err(SessionError::NoAccountSelected)
        );
    }
}
