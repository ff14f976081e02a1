//! Per-currency running balance.
//!
//! An [`Inventory`] sums amounts by currency, keeping currencies in the
//! order they were first added. A currency whose sum returns to exactly
//! zero is dropped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Amount;

/// Amounts summed by currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    positions: Vec<Amount>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
        }
    }

    /// Add an amount to the matching currency.
    pub fn add(&mut self, amount: &Amount) {
        match self
            .positions
            .iter()
            .position(|p| p.currency == amount.currency)
        {
            Some(idx) => {
                self.positions[idx] += amount;
                if self.positions[idx].is_zero() {
                    self.positions.remove(idx);
                }
            }
            None if amount.is_zero() => {}
            None => self.positions.push(amount.clone()),
        }
    }

    /// Add every position of `other`.
    pub fn merge(&mut self, other: &Self) {
        for amount in &other.positions {
            self.add(amount);
        }
    }

    /// Total held in `currency`.
    #[must_use]
    pub fn units(&self, currency: &str) -> Decimal {
        self.positions
            .iter()
            .find(|p| p.currency == currency)
            .map_or(Decimal::ZERO, |p| p.number)
    }

    /// The non-zero positions, in first-seen currency order.
    #[must_use]
    pub fn positions(&self) -> &[Amount] {
        &self.positions
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.positions.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_same_currency() {
        let mut inv = Inventory::new();
        inv.add(&Amount::new(dec!(10.00), "USD"));
        inv.add(&Amount::new(dec!(2.5), "USD"));
        assert_eq!(inv.units("USD"), dec!(12.50));
        assert_eq!(inv.positions().len(), 1);
    }

    #[test]
    fn test_currency_order_is_first_seen() {
        let mut inv = Inventory::new();
        inv.add(&Amount::new(dec!(1), "USD"));
        inv.add(&Amount::new(dec!(1), "EUR"));
        inv.add(&Amount::new(dec!(1), "USD"));
        let currencies: Vec<_> = inv.positions().iter().map(|p| p.currency.as_str()).collect();
        assert_eq!(currencies, vec!["USD", "EUR"]);
    }

    #[test]
    fn test_zero_sum_is_dropped() {
        let mut inv = Inventory::new();
        inv.add(&Amount::new(dec!(5), "USD"));
        inv.add(&Amount::new(dec!(-5), "USD"));
        assert!(inv.is_empty());
        assert_eq!(inv.units("USD"), Decimal::ZERO);
    }

    #[test]
    fn test_merge_and_display() {
        let mut a = Inventory::new();
        a.add(&Amount::new(dec!(1.00), "USD"));
        let mut b = Inventory::new();
        b.add(&Amount::new(dec!(2), "EUR"));
        a.merge(&b);
        assert_eq!(a.to_string(), "(1.00 USD, 2 EUR)");
    }
}
