//! In-memory collaborators for deterministic session tests
//!
//! - [`InMemoryLedger`]: HashMap-backed PINs and balances
//! - [`InMemoryCashStore`]: a single cash reserve
//! - [`FixedCardReader`]: always reads the configured card
//!
//! Each one counts its calls and can be told to fail once, so tests can
//! assert that a refused operation never reached a collaborator and can
//! drive the partial-failure paths of a withdrawal.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use atm_core::environment::{AccountLedger, CardReader, CashStore, CashStoreError, LedgerError};
use atm_core::types::{AccountId, Amount, CardId, Pin};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// In-memory ledger.
///
/// Cards and accounts are independent maps, as at a real bank: the PIN
/// belongs to the card, the balance to the account.
///
/// # Example
///
/// ```
/// use atm_core::environment::AccountLedger;
/// use atm_core::types::{AccountId, Amount, CardId, Pin};
/// use atm_testing::InMemoryLedger;
///
/// let ledger = InMemoryLedger::new()
///     .with_card("CARD-1234", "4321")
///     .with_account("ACC-111", 100);
///
/// assert!(ledger.validate_pin(&CardId::new("CARD-1234"), &Pin::new("4321")));
/// ledger.credit(&AccountId::new("ACC-111"), Amount::new(50)).unwrap();
/// assert_eq!(ledger.balance(&AccountId::new("ACC-111")), Ok(Amount::new(150)));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    pins: RwLock<HashMap<CardId, String>>,
    balances: RwLock<HashMap<AccountId, Amount>>,
    next_balance_failure: Mutex<Option<LedgerError>>,
    next_debit_failure: Mutex<Option<LedgerError>>,
    pin_checks: AtomicUsize,
    mutations: AtomicUsize,
}

impl InMemoryLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card and its PIN
    #[must_use]
    pub fn with_card(self, card: &str, pin: &str) -> Self {
        self.pins
            .write()
            .unwrap()
            .insert(CardId::new(card), pin.to_string());
        self
    }

    /// Open an account with an opening balance
    #[must_use]
    pub fn with_account(self, account: &str, balance: u64) -> Self {
        self.balances
            .write()
            .unwrap()
            .insert(AccountId::new(account), Amount::new(balance));
        self
    }

    /// Make the next `balance` lookup fail with `error`.
    ///
    /// Simulates the bank link dropping before a withdrawal is checked.
    pub fn fail_next_balance(&self, error: LedgerError) {
        *self.next_balance_failure.lock().unwrap() = Some(error);
    }

    /// Make the next `debit` fail with `error`, whatever the balance.
    ///
    /// Simulates another terminal draining the account between the
    /// controller's balance check and its debit.
    pub fn fail_next_debit(&self, error: LedgerError) {
        *self.next_debit_failure.lock().unwrap() = Some(error);
    }

    /// Balance of `account` without counting as a call
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Option<Amount> {
        self.balances.read().unwrap().get(account).copied()
    }

    /// Number of `validate_pin` calls so far
    #[must_use]
    pub fn pin_checks(&self) -> usize {
        self.pin_checks.load(Ordering::SeqCst)
    }

    /// Number of successful debits and credits so far
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

impl AccountLedger for InMemoryLedger {
    fn validate_pin(&self, card: &CardId, pin: &Pin) -> bool {
        self.pin_checks.fetch_add(1, Ordering::SeqCst);
        self.pins
            .read()
            .unwrap()
            .get(card)
            .is_some_and(|expected| expected == pin.expose())
    }

    fn balance(&self, account: &AccountId) -> Result<Amount, LedgerError> {
        if let Some(error) = self.next_balance_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.balance_of(account)
            .ok_or_else(|| LedgerError::UnknownAccount(account.clone()))
    }

    fn debit(&self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        if let Some(error) = self.next_debit_failure.lock().unwrap().take() {
            return Err(error);
        }

        let mut balances = self.balances.write().unwrap();
        let balance = balances
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount(account.clone()))?;
        let available = *balance;
        *balance = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                account: account.clone(),
                requested: amount,
                available,
            })?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn credit(&self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let mut balances = self.balances.write().unwrap();
        let balance = balances
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount(account.clone()))?;
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory cash reserve.
///
/// # Example
///
/// ```
/// use atm_core::environment::CashStore;
/// use atm_core::types::Amount;
/// use atm_testing::InMemoryCashStore;
///
/// let cash = InMemoryCashStore::new(200);
/// cash.dispense(Amount::new(70)).unwrap();
/// assert_eq!(cash.reserve(), Amount::new(130));
/// assert!(!cash.has_cash(Amount::new(131)));
/// ```
#[derive(Debug)]
pub struct InMemoryCashStore {
    reserve: Mutex<Amount>,
    dispensed: Mutex<Amount>,
    next_dispense_failure: Mutex<Option<CashStoreError>>,
}

impl InMemoryCashStore {
    /// Create a store holding `reserve` units
    #[must_use]
    pub fn new(reserve: u64) -> Self {
        Self {
            reserve: Mutex::new(Amount::new(reserve)),
            dispensed: Mutex::new(Amount::ZERO),
            next_dispense_failure: Mutex::new(None),
        }
    }

    /// Make the next `dispense` fail with `error` without touching the reserve
    pub fn fail_next_dispense(&self, error: CashStoreError) {
        *self.next_dispense_failure.lock().unwrap() = Some(error);
    }

    /// Cash left in the machine
    #[must_use]
    pub fn reserve(&self) -> Amount {
        *self.reserve.lock().unwrap()
    }

    /// Total handed out so far
    #[must_use]
    pub fn dispensed(&self) -> Amount {
        *self.dispensed.lock().unwrap()
    }
}

impl CashStore for InMemoryCashStore {
    fn has_cash(&self, amount: Amount) -> bool {
        amount <= self.reserve()
    }

    fn dispense(&self, amount: Amount) -> Result<(), CashStoreError> {
        if let Some(error) = self.next_dispense_failure.lock().unwrap().take() {
            return Err(error);
        }

        let mut reserve = self.reserve.lock().unwrap();
        let available = *reserve;
        *reserve = available
            .checked_sub(amount)
            .ok_or(CashStoreError::InsufficientReserve {
                requested: amount,
                available,
            })?;

        let mut dispensed = self.dispensed.lock().unwrap();
        let total = *dispensed;
        *dispensed = total.checked_add(amount).unwrap_or(total);
        Ok(())
    }
}

/// Card reader that always reads the same card until told otherwise
#[derive(Debug)]
pub struct FixedCardReader {
    card: Mutex<CardId>,
    reads: AtomicUsize,
    ejects: AtomicUsize,
}

impl FixedCardReader {
    /// Create a reader holding `card`
    #[must_use]
    pub fn new(card: &str) -> Self {
        Self {
            card: Mutex::new(CardId::new(card)),
            reads: AtomicUsize::new(0),
            ejects: AtomicUsize::new(0),
        }
    }

    /// Swap in a different card for the next read
    pub fn load(&self, card: &str) {
        *self.card.lock().unwrap() = CardId::new(card);
    }

    /// Number of reads so far
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of ejects so far
    #[must_use]
    pub fn ejects(&self) -> usize {
        self.ejects.load(Ordering::SeqCst)
    }
}

impl CardReader for FixedCardReader {
    fn read_card(&self) -> CardId {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.card.lock().unwrap().clone()
    }

    fn eject_card(&self) {
        self.ejects.fetch_add(1, Ordering::SeqCst);
    }
}
