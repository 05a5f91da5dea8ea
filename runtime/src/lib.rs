//! # ATM Runtime
//!
//! The session controller for an ATM terminal.
//!
//! [`SessionController`] holds the per-session state (card, authentication,
//! selected account) and mediates every operation through the collaborators
//! in a [`TerminalEnvironment`].
//!
//! ## Ordering Rules
//!
//! - A PIN can only be entered with a card in the reader
//! - An account can only be selected after the PIN is verified
//! - Balance, deposit and withdrawal need a selected account
//! - A withdrawal checks the balance and the cash reserve before the ledger
//!   is debited, and debits before any cash is dispensed
//!
//! ## Example
//!
//! ```
//! use atm_core::{AccountId, Amount, Pin, SessionError};
//! use atm_runtime::SessionController;
//! use atm_testing::fixtures::ReferenceTerminal;
//!
//! let terminal = ReferenceTerminal::new();
//! let mut atm = SessionController::new(terminal.environment());
//!
//! // Nothing works before the card is in
//! assert_eq!(atm.enter_pin(&Pin::new("4321")), Err(SessionError::NoCard));
//!
//! atm.insert_card();
//! assert_eq!(atm.enter_pin(&Pin::new("4321")), Ok(true));
//! assert_eq!(atm.select_account(AccountId::new("ACC-111")), Ok(()));
//! assert_eq!(atm.balance(), Ok(Amount::new(100)));
//! ```

/// Injected collaborators
pub mod environment;

/// Session controller
pub mod controller;

pub use controller::SessionController;
pub use environment::TerminalEnvironment;
