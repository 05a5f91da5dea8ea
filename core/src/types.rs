//! Domain types shared by the controller and its collaborators.
//!
//! Identifiers are opaque strings issued by the card network and the bank.
//! Money is counted in whole currency units, so there is no rounding anywhere
//! in the session.

use serde::{Deserialize, Serialize};

/// Opaque identifier read from an inserted card
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(String);

impl CardId {
    /// Creates a `CardId` from the raw identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an account held at the ledger
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Creates an `AccountId` from the raw identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A PIN as typed on the keypad.
///
/// `Debug` is redacted so a PIN never ends up in logs or panic messages.
/// No `Display` and no serde support.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Creates a `Pin` from the digits entered
    #[must_use]
    pub fn new(digits: impl Into<String>) -> Self {
        Self(digits.into())
    }

    /// Returns the digits, for a ledger to compare against its records
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Amount of money in whole currency units.
///
/// Negative amounts cannot be expressed; zero is the only non-positive value
/// and every transaction rejects it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount
    pub const ZERO: Self = Self(0);

    /// Creates an `Amount` from whole units
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole units
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` if it would go below zero
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_debug_is_redacted() {
        let pin = Pin::new("4321");
        let rendered = format!("{pin:?}");
        assert!(!rendered.contains("4321"));
        assert_eq!(rendered, "Pin(****)");
        assert_eq!(pin.expose(), "4321");
    }

    #[test]
    fn identifiers_display_raw_value() {
        assert_eq!(CardId::new("CARD-1234").to_string(), "CARD-1234");
        assert_eq!(AccountId::new("ACC-111").to_string(), "ACC-111");
    }

    #[test]
    fn amount_checked_arithmetic() {
        let hundred = Amount::new(100);
        assert_eq!(hundred.checked_add(Amount::new(50)), Some(Amount::new(150)));
        assert_eq!(hundred.checked_sub(Amount::new(30)), Some(Amount::new(70)));
        assert_eq!(hundred.checked_sub(Amount::new(101)), None);
        assert_eq!(Amount::new(u64::MAX).checked_add(Amount::new(1)), None);
    }

    #[test]
    fn amount_zero() {
        assert!(Amount::ZERO.is_zero());
        assert!(!Amount::new(1).is_zero());
        assert_eq!(Amount::default(), Amount::ZERO);
    }

    #[test]
    fn amount_serializes_as_plain_number() {
        let json = serde_json::to_string(&Amount::new(80)).unwrap();
        assert_eq!(json, "80");
    }
}
