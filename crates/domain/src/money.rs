//! Monetary amounts.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Amount of money in the smallest currency unit.
///
/// Integer arithmetic keeps order totals exact; the sum of line totals
/// always equals the stored order total.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in minor units.
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns the price of `quantity` units at this unit price.
    ///
    /// Fails with [`DomainError::AmountOverflow`] when the result does not
    /// fit in an `i64` of minor units.
    pub fn multiply(&self, quantity: u32) -> Result<Self, DomainError> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Self::from_cents)
            .ok_or(DomainError::AmountOverflow)
    }

    pub fn checked_add(&self, other: Money) -> Result<Self, DomainError> {
        self.cents
            .checked_add(other.cents)
            .map(Self::from_cents)
            .ok_or(DomainError::AmountOverflow)
    }

    /// Adds up `amounts`, failing on the first overflow.
    pub fn total(amounts: impl IntoIterator<Item = Money>) -> Result<Self, DomainError> {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply() {
        assert_eq!(
            Money::from_cents(10_000).multiply(2),
            Ok(Money::from_cents(20_000))
        );
        assert_eq!(Money::from_cents(250).multiply(0), Ok(Money::zero()));
    }

    #[test]
    fn test_multiply_overflow() {
        let price = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(price.multiply(2), Err(DomainError::AmountOverflow));
        assert!(price.multiply(1).is_ok());
    }

    #[test]
    fn test_total() {
        let total = Money::total([100, 250, 5].into_iter().map(Money::from_cents)).unwrap();
        assert_eq!(total.cents(), 355);
        assert_eq!(Money::total(std::iter::empty()), Ok(Money::zero()));
    }

    #[test]
    fn test_total_overflow() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(Money::total([half, half]), Err(DomainError::AmountOverflow));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-150).to_string(), "-1.50");
    }

    #[test]
    fn test_is_positive() {
        assert!(Money::from_cents(1).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(!Money::from_cents(-1).is_positive());
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Money::from_cents(990)).unwrap(), "990");
    }
}
