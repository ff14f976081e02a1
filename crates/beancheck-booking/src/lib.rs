//! Booking passes run between loading and validation.
//!
//! This crate provides:
//! - Transaction interpolation (filling in missing amounts)
//! - Transaction balancing verification
//! - Tolerance calculation
//! - Pad expansion into synthetic padding transactions
//!
//! # Interpolation
//!
//! A posting written without an amount absorbs whatever the other postings
//! leave over, one filled posting per currency:
//!
//! ```text
//! 2024-01-15 * "Groceries"
//!   Expenses:Food  50.00 USD
//!   Assets:Cash               <- amount inferred as -50.00 USD
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod interpolate;
mod pad;

pub use interpolate::{interpolate, InterpolationError, InterpolationResult};
pub use pad::{merge_with_padding, process_pads, PadError, PadResult, PADDING_NARRATION_PREFIX};

use beancheck_core::{Amount, Posting, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Tolerance used for a currency no posting constrains.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Calculate the tolerance for a set of amounts.
///
/// Tolerance is the maximum of all individual amount tolerances.
#[must_use]
pub fn calculate_tolerance(amounts: &[&Amount]) -> HashMap<String, Decimal> {
    let mut tolerances: HashMap<String, Decimal> = HashMap::new();

    for amount in amounts {
        let tol = amount.inferred_tolerance();
        tolerances
            .entry(amount.currency.clone())
            .and_modify(|t| *t = (*t).max(tol))
            .or_insert(tol);
    }

    tolerances
}

/// Tolerances implied by the amounts written on a transaction.
///
/// Interpolated postings are left out: their precision is whatever the
/// arithmetic produced, not what the user wrote.
#[must_use]
pub fn transaction_tolerances(transaction: &Transaction) -> HashMap<String, Decimal> {
    let written: Vec<&Amount> = transaction
        .postings
        .iter()
        .filter(|p| !p.is_automatic())
        .filter_map(Posting::amount)
        .collect();
    calculate_tolerance(&written)
}

/// The amount a posting contributes to the balance of its transaction.
///
/// - Held at cost: the total cost, in the cost currency
/// - With a price annotation: the converted amount, in the price currency
/// - Otherwise: the units themselves
///
/// Returns `None` while the units are incomplete.
#[must_use]
pub fn posting_weight(posting: &Posting) -> Option<Amount> {
    let units = posting.amount()?;
    if let Some(cost) = posting.cost.as_ref().and_then(|c| c.total_for(units)) {
        return Some(cost);
    }
    if let Some(price) = &posting.price {
        return Some(price.convert(units));
    }
    Some(units.clone())
}

/// Calculate the residual (imbalance) of a transaction.
///
/// Returns a map of currency -> residual amount.
/// A balanced transaction has all residuals within tolerance.
#[must_use]
pub fn calculate_residual(transaction: &Transaction) -> BTreeMap<String, Decimal> {
    let mut residuals: BTreeMap<String, Decimal> = BTreeMap::new();

    for weight in transaction.postings.iter().filter_map(posting_weight) {
        *residuals.entry(weight.currency).or_default() += weight.number;
    }

    residuals
}

/// Check if a transaction is balanced within tolerance.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn is_balanced(transaction: &Transaction, tolerances: &HashMap<String, Decimal>) -> bool {
    calculate_residual(transaction)
        .iter()
        .all(|(currency, residual)| {
            let tolerance = tolerances
                .get(currency)
                .copied()
                .unwrap_or(DEFAULT_TOLERANCE);
            residual.abs() <= tolerance
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beancheck_core::{CostSpec, NaiveDate, PriceAnnotation};
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_calculate_residual_balanced() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.00), "USD"),
            ))
            .with_posting(Posting::new(
                "Assets:Cash",
                Amount::new(dec!(-50.00), "USD"),
            ));

        let residual = calculate_residual(&txn);
        assert_eq!(residual.get("USD"), Some(&dec!(0)));
    }

    #[test]
    fn test_calculate_residual_unbalanced() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.00), "USD"),
            ))
            .with_posting(Posting::new(
                "Assets:Cash",
                Amount::new(dec!(-45.00), "USD"),
            ));

        let residual = calculate_residual(&txn);
        assert_eq!(residual.get("USD"), Some(&dec!(5.00)));
    }

    #[test]
    fn test_residual_uses_cost_and_price() {
        let txn = Transaction::new(date(2024, 1, 15), "Buy")
            .with_posting(
                Posting::new("Assets:Broker", Amount::new(dec!(10), "AAPL")).with_cost(
                    CostSpec::empty()
                        .with_number_per(dec!(150.00))
                        .with_currency("USD"),
                ),
            )
            .with_posting(
                Posting::new("Assets:Wallet", Amount::new(dec!(-1200.00), "EUR"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.25), "USD"))),
            );

        let residual = calculate_residual(&txn);
        assert_eq!(residual.get("USD"), Some(&dec!(0)));
        assert!(!residual.contains_key("AAPL"));
        assert!(!residual.contains_key("EUR"));
    }

    #[test]
    fn test_is_balanced_within_tolerance() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.004), "USD"),
            ))
            .with_posting(Posting::new(
                "Assets:Cash",
                Amount::new(dec!(-50.00), "USD"),
            ));

        let tolerances = transaction_tolerances(&txn);

        // 0.004 is within the 0.005 implied by two decimals
        assert!(is_balanced(&txn, &tolerances));
    }

    #[test]
    fn test_is_not_balanced() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.10), "USD"),
            ))
            .with_posting(Posting::new(
                "Assets:Cash",
                Amount::new(dec!(-50.00), "USD"),
            ));

        assert!(!is_balanced(&txn, &transaction_tolerances(&txn)));
    }

    #[test]
    fn test_calculate_tolerance() {
        let amounts = [
            Amount::new(dec!(100), "USD"),    // scale 0 -> tol 0.5
            Amount::new(dec!(50.00), "USD"),  // scale 2 -> tol 0.005
            Amount::new(dec!(25.000), "EUR"), // scale 3 -> tol 0.0005
        ];

        let refs: Vec<&Amount> = amounts.iter().collect();
        let tolerances = calculate_tolerance(&refs);

        assert_eq!(tolerances.get("USD"), Some(&dec!(0.5)));
        assert_eq!(tolerances.get("EUR"), Some(&dec!(0.0005)));
    }

    #[test]
    fn test_default_tolerance() {
        assert_eq!(DEFAULT_TOLERANCE, dec!(0.005));
    }
}
