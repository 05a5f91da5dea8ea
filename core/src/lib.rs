//! # ATM Core
//!
//! Domain types, collaborator traits and the error taxonomy for an ATM
//! session controller.
//!
//! ## Core Concepts
//!
//! - **Session**: per-terminal state between card insertion and ejection
//! - **Collaborators**: the ledger, cash store and card reader, injected as traits
//! - **SessionError**: every way a session operation can be refused or fail
//!
//! The controller that ties these together lives in `atm-runtime`;
//! in-memory collaborators for tests live in `atm-testing`.
//!
//! ## Example
//!
//! ```
//! use atm_core::session::{Session, SessionStage};
//! use atm_core::types::{AccountId, CardId};
//! use chrono::Utc;
//!
//! let mut session = Session::new();
//! session.begin(CardId::new("CARD-1234"), Utc::now());
//!
//! // Not authenticated yet, so the selection is ignored
//! session.select_account(AccountId::new("ACC-111"));
//! assert_eq!(session.stage(), SessionStage::CardInserted);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Collaborator traits (ledger, cash store, card reader, clock)
pub mod environment;

/// Error taxonomy for session operations
pub mod error;

/// Session state and derived stage
pub mod session;

/// Identifiers, PINs and amounts
pub mod types;

pub use environment::{
    AccountLedger, CardReader, CashStore, CashStoreError, Clock, LedgerError, SystemClock,
};
pub use error::{CollaboratorFailure, SessionError};
pub use session::{Session, SessionSnapshot, SessionStage};
pub use types::{AccountId, Amount, CardId, Pin};
