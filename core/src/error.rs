//! Error taxonomy for session operations.

use crate::environment::{CashStoreError, LedgerError};
use crate::types::{AccountId, Amount};
use thiserror::Error;

/// Unexpected failure surfaced by a collaborator mid-operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorFailure {
    /// The ledger failed after the controller's own checks had passed,
    /// e.g. a debit racing another terminal. Nothing was dispensed.
    #[error("Ledger failure: {0}")]
    Ledger(#[source] LedgerError),

    /// The account was debited but the cash never left the machine.
    ///
    /// The ledger and the reserve now disagree; an operator has to reconcile.
    #[error("Dispense of {amount} failed after debiting {account}: {source}")]
    DispenseAfterDebit {
        /// Account that was debited.
        account: AccountId,
        /// Amount debited but not dispensed.
        amount: Amount,
        /// Why the dispenser failed.
        #[source]
        source: CashStoreError,
    },
}

/// Errors returned by the session controller.
///
/// Every variant except [`SessionError::Collaborator`] is detected before any
/// collaborator is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No card is in the reader.
    #[error("No card inserted")]
    NoCard,

    /// The PIN has not been verified for the current card.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// No account has been selected in this session.
    #[error("No account selected")]
    NoAccountSelected,

    /// The amount is zero.
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// The account balance does not cover the withdrawal.
    #[error("Insufficient funds: requested {requested}, balance {available}")]
    InsufficientFunds {
        /// Amount asked for.
        requested: Amount,
        /// Balance at the time of the check.
        available: Amount,
    },

    /// The machine does not hold enough cash for the withdrawal.
    #[error("ATM has insufficient cash for {requested}")]
    InsufficientCash {
        /// Amount asked for.
        requested: Amount,
    },

    /// The selected account does not exist at the ledger.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A collaborator failed unexpectedly.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorFailure),
}

impl SessionError {
    /// True for pure validation failures that had no side effects.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        !matches!(self, Self::Collaborator(_))
    }

    /// True when the ledger and the cash reserve may disagree.
    #[must_use]
    pub const fn requires_reconciliation(&self) -> bool {
        matches!(
            self,
            Self::Collaborator(CollaboratorFailure::DispenseAfterDebit { .. })
        )
    }
}

/// An unknown account becomes [`SessionError::AccountNotFound`]; anything
/// else is a collaborator failure.
impl From<LedgerError> for SessionError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::UnknownAccount(account) => Self::AccountNotFound(account),
            other => Self::Collaborator(CollaboratorFailure::Ledger(other)),
        }
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
