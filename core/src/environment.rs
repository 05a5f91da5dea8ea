//! Collaborator traits injected into the session controller.
//!
//! The controller owns none of the money. Balances live behind
//! [`AccountLedger`], banknotes behind [`CashStore`], and the physical card
//! behind [`CardReader`]. Each trait takes `&self` so implementations can be
//! shared as `Arc<dyn Trait>` and handle their own locking.
//!
//! # Example
//!
//! ```
//! use atm_core::environment::{CashStore, CashStoreError};
//! use atm_core::types::Amount;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Cassette {
//!     notes: AtomicU64,
//! }
//!
//! impl CashStore for Cassette {
//!     fn has_cash(&self, amount: Amount) -> bool {
//!         amount.units() <= self.notes.load(Ordering::SeqCst)
//!     }
//!
//!     fn dispense(&self, amount: Amount) -> Result<(), CashStoreError> {
//!         let available = self.notes.load(Ordering::SeqCst);
//!         if amount.units() > available {
//!             return Err(CashStoreError::InsufficientReserve {
//!                 requested: amount,
//!                 available: Amount::new(available),
//!             });
//!         }
//!         self.notes.fetch_sub(amount.units(), Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let cassette = Cassette { notes: AtomicU64::new(200) };
//! assert!(cassette.has_cash(Amount::new(150)));
//! assert!(cassette.dispense(Amount::new(250)).is_err());
//! ```

use crate::types::{AccountId, Amount, CardId, Pin};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures reported by an [`AccountLedger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger has no account with this identifier.
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// A debit asked for more than the account holds.
    #[error("Insufficient balance on {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Account that was debited.
        account: AccountId,
        /// Amount the debit asked for.
        requested: Amount,
        /// Balance at the time of the debit.
        available: Amount,
    },

    /// A credit would overflow the account balance.
    #[error("Balance overflow on {0}")]
    Overflow(AccountId),

    /// The ledger could not be reached or refused the request.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a [`CashStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CashStoreError {
    /// The reserve holds less than the requested amount.
    #[error("Insufficient cash reserve: requested {requested}, available {available}")]
    InsufficientReserve {
        /// Amount asked for.
        requested: Amount,
        /// Amount physically in the machine.
        available: Amount,
    },

    /// The dispensing mechanism failed.
    #[error("Dispenser hardware fault: {0}")]
    Hardware(String),
}

/// System of record for accounts: PIN checks, balances, debits and credits.
pub trait AccountLedger: Send + Sync {
    /// Checks whether `pin` is the PIN for `card`.
    ///
    /// An unknown card is simply a mismatch.
    fn validate_pin(&self, card: &CardId, pin: &Pin) -> bool;

    /// Returns the current balance of `account`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownAccount`] if the account does not exist.
    fn balance(&self, account: &AccountId) -> Result<Amount, LedgerError>;

    /// Removes `amount` from `account`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownAccount`] or [`LedgerError::InsufficientBalance`].
    fn debit(&self, account: &AccountId, amount: Amount) -> Result<(), LedgerError>;

    /// Adds `amount` to `account`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownAccount`] or [`LedgerError::Overflow`].
    fn credit(&self, account: &AccountId, amount: Amount) -> Result<(), LedgerError>;
}

/// The machine's physical cash reserve.
pub trait CashStore: Send + Sync {
    /// Whether `amount` can be dispensed right now.
    fn has_cash(&self, amount: Amount) -> bool;

    /// Hands `amount` to the customer and reduces the reserve.
    ///
    /// # Errors
    ///
    /// [`CashStoreError::InsufficientReserve`] if `amount` exceeds the
    /// reserve, [`CashStoreError::Hardware`] on a mechanism fault.
    fn dispense(&self, amount: Amount) -> Result<(), CashStoreError>;
}

/// Card reader hardware.
pub trait CardReader: Send + Sync {
    /// Reads the identifier of the card in the slot.
    fn read_card(&self) -> CardId;

    /// Releases the card, if any. Safe to call with an empty slot.
    fn eject_card(&self);
}

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use atm_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used outside tests
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
