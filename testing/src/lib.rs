//! # ATM Testing
//!
//! Testing utilities and helpers for the ATM session controller.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator traits
//! - A deterministic clock
//! - The reference terminal fixture (one card, one account, one cash reserve)
//! - A Given-When-Then harness and session assertions
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use atm_core::{AccountId, Amount, Pin};
//! use atm_runtime::SessionController;
//! use atm_testing::ReferenceTerminal;
//!
//! let terminal = ReferenceTerminal::new();
//! let mut atm = SessionController::new(terminal.environment());
//!
//! atm.insert_card();
//! atm.enter_pin(&Pin::new("4321")).unwrap();
//! atm.select_account(AccountId::new("ACC-111")).unwrap();
//! atm.withdraw(Amount::new(70)).unwrap();
//!
//! assert_eq!(terminal.cash().reserve(), Amount::new(130));
//! ```

use atm_core::environment::Clock;
use chrono::{DateTime, Utc};

/// In-memory ledger, cash store and card reader
pub mod collaborator_mocks;


/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use atm_testing::mocks::FixedClock;
    /// use atm_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// The time this clock always reports
        #[must_use]
        pub const fn time(&self) -> DateTime<Utc> {
            self.time
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made terminals
pub mod fixtures {
    use crate::collaborator_mocks::{FixedCardReader, InMemoryCashStore, InMemoryLedger};
    use crate::mocks::test_clock;
    use atm_runtime::TerminalEnvironment;
    use std::sync::Arc;

    /// Card, PIN, account and balances of the reference session:
    /// card `CARD-1234` with PIN `4321`, account `ACC-111` holding 100,
    /// and 200 in the machine.
    ///
    /// Collaborators are shared `Arc`s, so the terminal can be inspected
    /// after a controller built from [`ReferenceTerminal::environment`] has
    /// used them.
    #[derive(Debug, Clone)]
    pub struct ReferenceTerminal {
        card: String,
        pin: String,
        account: String,
        ledger: Arc<InMemoryLedger>,
        cash: Arc<InMemoryCashStore>,
        reader: Arc<FixedCardReader>,
    }

    impl ReferenceTerminal {
        /// Card read by the reader
        pub const CARD: &'static str = "CARD-1234";
        /// PIN registered for [`Self::CARD`]
        pub const PIN: &'static str = "4321";
        /// Account at the ledger
        pub const ACCOUNT: &'static str = "ACC-111";
        /// Opening balance of [`Self::ACCOUNT`]
        pub const OPENING_BALANCE: u64 = 100;
        /// Cash in the machine
        pub const CASH_RESERVE: u64 = 200;

        /// Create the reference terminal
        #[must_use]
        pub fn new() -> Self {
            Self::custom(
                Self::CARD,
                Self::PIN,
                Self::ACCOUNT,
                Self::OPENING_BALANCE,
                Self::CASH_RESERVE,
            )
        }

        /// Create a terminal with a single card and account of your choosing
        #[must_use]
        pub fn custom(card: &str, pin: &str, account: &str, balance: u64, reserve: u64) -> Self {
            Self {
                card: card.to_string(),
                pin: pin.to_string(),
                account: account.to_string(),
                ledger: Arc::new(
                    InMemoryLedger::new()
                        .with_card(card, pin)
                        .with_account(account, balance),
                ),
                cash: Arc::new(InMemoryCashStore::new(reserve)),
                reader: Arc::new(FixedCardReader::new(card)),
            }
        }

        /// Same card and account with a different opening balance
        #[must_use]
        pub fn with_balance(self, balance: u64) -> Self {
            let reserve = self.cash.reserve().units();
            Self::custom(&self.card, &self.pin, &self.account, balance, reserve)
        }

        /// Same card and account with a different cash reserve
        #[must_use]
        pub fn with_reserve(mut self, reserve: u64) -> Self {
            self.cash = Arc::new(InMemoryCashStore::new(reserve));
            self
        }

        /// Environment wired to this terminal's collaborators and the test clock
        #[must_use]
        pub fn environment(&self) -> TerminalEnvironment {
            TerminalEnvironment::new(self.ledger.clone(), self.cash.clone(), self.reader.clone())
                .with_clock(Arc::new(test_clock()))
        }

        /// Card identifier
        #[must_use]
        pub fn card(&self) -> &str {
            &self.card
        }

        /// PIN for the card
        #[must_use]
        pub fn pin(&self) -> &str {
            &self.pin
        }

        /// Account identifier
        #[must_use]
        pub fn account(&self) -> &str {
            &self.account
        }

        /// Shared ledger
        #[must_use]
        pub const fn ledger(&self) -> &Arc<InMemoryLedger> {
            &self.ledger
        }

        /// Shared cash store
        #[must_use]
        pub const fn cash(&self) -> &Arc<InMemoryCashStore> {
            &self.cash
        }

        /// Shared card reader
        #[must_use]
        pub const fn reader(&self) -> &Arc<FixedCardReader> {
            &self.reader
        }
    }

    impl Default for ReferenceTerminal {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a test-friendly tracing subscriber.
    ///
    /// Honors `RUST_LOG`, defaults to `atm_runtime=debug`, and writes through
    /// the test harness so output is captured per test. Safe to call from
    /// every test; only the first call installs.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "atm_runtime=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use atm_core::types::Amount;
    use proptest::prelude::*;

    /// One caller action against a controller
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SessionOp {
        /// `insert_card()`
        InsertCard,
        /// `enter_pin(pin)`; `true` picks the fixture PIN, `false` a wrong one
        EnterPin(bool),
        /// `select_account(..)`; `true` picks the fixture account, `false` an unknown one
        SelectAccount(bool),
        /// `balance()`
        Balance,
        /// `deposit(amount)`
        Deposit(Amount),
        /// `withdraw(amount)`
        Withdraw(Amount),
        /// `eject_card()`
        EjectCard,
    }

    /// Amounts in the range the reference terminal exercises, zero included
    pub fn arb_amount() -> impl Strategy<Value = Amount> {
        (0u64..=300).prop_map(Amount::new)
    }

    /// Strictly positive amounts
    pub fn arb_positive_amount() -> impl Strategy<Value = Amount> {
        (1u64..=300).prop_map(Amount::new)
    }

    /// Any single operation, weighted towards reaching transactions
    pub fn arb_op() -> impl Strategy<Value = SessionOp> {
        prop_oneof![
            2 => Just(SessionOp::InsertCard),
            3 => prop::bool::weighted(0.8).prop_map(SessionOp::EnterPin),
            3 => prop::bool::weighted(0.8).prop_map(SessionOp::SelectAccount),
            1 => Just(SessionOp::Balance),
            2 => arb_amount().prop_map(SessionOp::Deposit),
            2 => arb_amount().prop_map(SessionOp::Withdraw),
            1 => Just(SessionOp::EjectCard),
        ]
    }

    /// Sequences of up to `max_len` operations
    pub fn arb_ops(max_len: usize) -> impl Strategy<Value = Vec<SessionOp>> {
        prop::collection::vec(arb_op(), 0..=max_len)
    }
}

// Re-export commonly used items
pub use collaborator_mocks::{FixedCardReader, InMemoryCashStore, InMemoryLedger};
pub use fixtures::ReferenceTerminal;
pub use mocks::{FixedClock, test_clock};
pub use session_test::{SessionTest, assertions};
