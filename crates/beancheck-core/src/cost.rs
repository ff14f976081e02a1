//! Cost specification written on a posting.
//!
//! `{150.00 USD}` fixes a per-unit cost, `{{1500.00 USD}}` a total cost,
//! and `{}` leaves the cost to be matched against an existing lot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Amount;

/// A cost annotation as written in the source, any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSpec {
    /// Cost per unit (`{150 USD}`)
    pub number_per: Option<Decimal>,
    /// Total cost (`{{1500 USD}}`)
    pub number_total: Option<Decimal>,
    /// Currency of the cost
    pub currency: Option<String>,
    /// Acquisition date
    pub date: Option<NaiveDate>,
    /// Lot label
    pub label: Option<String>,
}

impl CostSpec {
    /// An empty cost spec (`{}`).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the per-unit cost.
    #[must_use]
    pub fn with_number_per(mut self, number: Decimal) -> Self {
        self.number_per = Some(number);
        self
    }

    /// Set the total cost.
    #[must_use]
    pub fn with_number_total(mut self, number: Decimal) -> Self {
        self.number_total = Some(number);
        self
    }

    /// Set the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Total cost of `units` held under this spec.
    ///
    /// Returns `None` when the currency or both numbers are missing.
    #[must_use]
    pub fn total_for(&self, units: &Amount) -> Option<Amount> {
        let currency = self.currency.as_ref()?;
        let number = match (self.number_per, self.number_total) {
            (Some(per), total) => units.number * per + total.unwrap_or_default(),
            (None, Some(total)) if units.number.is_sign_negative() => -total,
            (None, Some(total)) => total,
            (None, None) => return None,
        };
        Some(Amount::new(number, currency.clone()))
    }
}

impl fmt::Display for CostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match (self.number_per, self.number_total, &self.currency) {
            (Some(n), _, Some(c)) => parts.push(format!("{n} {c}")),
            (None, Some(n), Some(c)) => parts.push(format!("# {n} {c}")),
            (_, _, Some(c)) => parts.push(c.clone()),
            _ => {}
        }
        if let Some(date) = self.date {
            parts.push(date.to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("\"{label}\""));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_for_per_unit() {
        let spec = CostSpec::empty()
            .with_number_per(dec!(150.00))
            .with_currency("USD");
        let total = spec.total_for(&Amount::new(dec!(10), "AAPL")).unwrap();
        assert_eq!(total, Amount::new(dec!(1500.00), "USD"));
    }

    #[test]
    fn test_total_for_total_cost_follows_sign() {
        let spec = CostSpec::empty()
            .with_number_total(dec!(1500))
            .with_currency("USD");
        let sold = spec.total_for(&Amount::new(dec!(-10), "AAPL")).unwrap();
        assert_eq!(sold.number, dec!(-1500));
    }

    #[test]
    fn test_total_for_incomplete() {
        assert!(CostSpec::empty()
            .total_for(&Amount::new(dec!(1), "AAPL"))
            .is_none());
    }

    #[test]
    fn test_display() {
        let spec = CostSpec::empty()
            .with_number_per(dec!(150))
            .with_currency("USD");
        assert_eq!(spec.to_string(), "{150 USD}");
        assert_eq!(CostSpec::empty().to_string(), "{}");
    }
}
