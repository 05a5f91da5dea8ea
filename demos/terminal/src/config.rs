//! Demo terminal configuration, read from `ATM_*` environment variables.

use anyhow::{Context, Result};

/// Card, account and cash the demo terminal is stocked with
///
/// `Debug` masks the PIN, so the config can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Card the reader returns (`ATM_CARD_ID`)
    pub card_id: String,
    /// PIN registered for the card (`ATM_PIN`)
    pub pin: String,
    /// Account selected after authentication (`ATM_ACCOUNT_ID`)
    pub account_id: String,
    /// Opening balance of the account (`ATM_OPENING_BALANCE`)
    pub opening_balance: u64,
    /// Cash loaded into the machine (`ATM_CASH_RESERVE`)
    pub cash_reserve: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            card_id: "CARD-1234".to_string(),
            pin: "4321".to_string(),
            account_id: "ACC-111".to_string(),
            opening_balance: 100,
            cash_reserve: 200,
        }
    }
}

impl std::fmt::Debug for TerminalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalConfig")
            .field("card_id", &self.card_id)
            .field("pin", &"****")
            .field("account_id", &self.account_id)
            .field("opening_balance", &self.opening_balance)
            .field("cash_reserve", &self.cash_reserve)
            .finish()
    }
}

impl TerminalConfig {
    /// Load from the process environment, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but not a whole number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but not a whole number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(card_id) = lookup("ATM_CARD_ID") {
            config.card_id = card_id;
        }
        if let Some(pin) = lookup("ATM_PIN") {
            config.pin = pin;
        }
        if let Some(account_id) = lookup("ATM_ACCOUNT_ID") {
            config.account_id = account_id;
        }
        if let Some(raw) = lookup("ATM_OPENING_BALANCE") {
            config.opening_balance = parse_units("ATM_OPENING_BALANCE", &raw)?;
        }
        if let Some(raw) = lookup("ATM_CASH_RESERVE") {
            config.cash_reserve = parse_units("ATM_CASH_RESERVE", &raw)?;
        }

        Ok(config)
    }
}

fn parse_units(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of currency units, got {raw:?}"))
}
