//! Injected dependencies for the session controller.

use atm_core::environment::{AccountLedger, CardReader, CashStore, Clock, SystemClock};
use std::sync::Arc;

/// Collaborators a terminal talks to
#[derive(Clone)]
pub struct TerminalEnvironment {
    /// Bank ledger (PINs, balances, debits, credits)
    pub ledger: Arc<dyn AccountLedger>,
    /// Cash dispenser and its reserve
    pub cash: Arc<dyn CashStore>,
    /// Card reader hardware
    pub reader: Arc<dyn CardReader>,
    /// Clock for stamping card insertion
    pub clock: Arc<dyn Clock>,
}

impl TerminalEnvironment {
    /// Creates a `TerminalEnvironment` using the system clock
    #[must_use]
    pub fn new(
        ledger: Arc<dyn AccountLedger>,
        cash: Arc<dyn CashStore>,
        reader: Arc<dyn CardReader>,
    ) -> Self {
        Self {
            ledger,
            cash,
            reader,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for TerminalEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalEnvironment").finish_non_exhaustive()
    }
}
