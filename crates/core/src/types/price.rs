//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are in Peruvian soles. The backend serializes `BigDecimal` as a
//! JSON number, and the persisted local cart stores plain numbers too, so
//! [`Price`] round-trips through JSON as a number rather than a string.

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in soles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero soles.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents (e.g. `550` is `S/. 5.50`).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, saturating at the largest representable
    /// amount.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Add for Price {
    type Output = Self;

    /// Saturates instead of overflowing.
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl std::fmt::Display for Price {
    /// Formats as shown in the store, e.g. `S/. 5.50`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S/. {:.2}", self.0.round_dp(2))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_two_decimals() {
        assert_eq!(Price::from_cents(550).to_string(), "S/. 5.50");
        assert_eq!(Price::new(Decimal::from(2)).to_string(), "S/. 2.00");
    }

    #[test]
    fn test_json_is_a_number() {
        let price: Price = serde_json::from_str("2.5").unwrap();
        assert_eq!(price, Price::from_cents(250));
        let json = serde_json::to_value(Price::from_cents(200)).unwrap();
        assert!(json.is_number());
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.times(u32::MAX), huge);
        assert_eq!(huge + Price::from_cents(100), huge);
        let total: Price = [huge.times(3), huge.times(2)].into_iter().sum();
        assert_eq!(total, huge);
    }

    #[test]
    fn test_sum_of_line_totals() {
        let total: Price = [Price::from_cents(550).times(2), Price::from_cents(1200)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(2300));
    }
}
