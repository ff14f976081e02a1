//! Transaction interpolation.
//!
//! Fills in missing posting amounts to balance transactions.

use beancheck_core::{
    meta, Amount, IncompleteAmount, MetaValue, Posting, PriceAnnotation, Transaction,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{calculate_residual, posting_weight};

/// Errors that can occur during interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// Multiple postings are missing amounts for the same currency.
    #[error("multiple postings missing amounts for currency {currency}")]
    MultipleMissing {
        /// The currency with multiple missing amounts.
        currency: String,
        /// Number of postings missing this currency.
        count: usize,
    },

    /// More than one posting was written without any amount.
    #[error("too many postings without an amount ({count})")]
    MultipleAutoPostings {
        /// Number of postings without an amount.
        count: usize,
    },

    /// Cannot infer currency for a posting.
    #[error("cannot infer currency for posting to account {account}")]
    CannotInferCurrency {
        /// The account of the posting.
        account: String,
    },

    /// The missing number sits behind a cost or price that cannot be inverted.
    #[error("cannot infer number for posting to account {account}")]
    CannotInferNumber {
        /// The account of the posting.
        account: String,
    },
}

/// Result of interpolation.
#[derive(Debug, Clone)]
pub struct InterpolationResult {
    /// The interpolated transaction.
    pub transaction: Transaction,
    /// Which posting indices (in the interpolated transaction) were filled in.
    pub filled_indices: Vec<usize>,
    /// Residuals after interpolation (should all be near zero).
    pub residuals: BTreeMap<String, Decimal>,
}

/// Interpolate missing amounts in a transaction.
///
/// # Rules
///
/// - A posting with only a number takes its currency from its cost or
///   price, or from the other postings when they all share one currency;
///   it is not marked automatic since its number was written
/// - At most one posting per currency may have only a currency written
/// - At most one posting may have nothing written at all; it is replaced
///   by one posting per currency left unbalanced, in currency order
///
/// Every posting filled here, and only those, gets `__automatic__: TRUE`
/// in its metadata. Filled postings keep the source location of the
/// posting they were inferred from.
///
/// # Example
///
/// ```
/// use beancheck_booking::interpolate;
/// use beancheck_core::{Amount, NaiveDate, Posting, Transaction};
/// use rust_decimal_macros::dec;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let txn = Transaction::new(date, "Test")
///     .with_posting(Posting::new("Expenses:Food", Amount::new(dec!(50.00), "USD")))
///     .with_posting(Posting::auto("Assets:Cash"));
///
/// let result = interpolate(&txn).unwrap();
/// let cash = result.transaction.postings[1].amount().unwrap();
/// assert_eq!(cash.to_string(), "-50.00 USD");
/// ```
///
/// # Errors
///
/// Returns an [`InterpolationError`] when the missing amounts are ambiguous.
pub fn interpolate(transaction: &Transaction) -> Result<InterpolationResult, InterpolationError> {
    let mut postings = transaction.postings.clone();
    let mut filled = vec![false; postings.len()];

    // Complete number-only postings first: they contribute to the residual.
    let single_currency = sole_written_currency(transaction);
    for posting in &mut postings {
        if let Some(IncompleteAmount::NumberOnly(number)) = posting.units {
            let currency = context_currency(posting)
                .or_else(|| single_currency.clone())
                .ok_or_else(|| InterpolationError::CannotInferCurrency {
                    account: posting.account.clone(),
                })?;
            posting.units = Some(IncompleteAmount::complete(number, currency));
        }
    }

    let mut residuals: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut missing_by_currency: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut auto_postings: Vec<usize> = Vec::new();

    for (i, posting) in postings.iter().enumerate() {
        match &posting.units {
            Some(IncompleteAmount::CurrencyOnly(currency)) => missing_by_currency
                .entry(currency.clone())
                .or_default()
                .push(i),
            None => auto_postings.push(i),
            _ => {
                if let Some(weight) = posting_weight(posting) {
                    *residuals.entry(weight.currency).or_default() += weight.number;
                }
            }
        }
    }

    // Check for multiple missing in same currency
    for (currency, indices) in &missing_by_currency {
        if indices.len() > 1 {
            return Err(InterpolationError::MultipleMissing {
                currency: currency.clone(),
                count: indices.len(),
            });
        }
    }
    if auto_postings.len() > 1 {
        return Err(InterpolationError::MultipleAutoPostings {
            count: auto_postings.len(),
        });
    }

    // Fill in known-currency missing postings
    for (currency, indices) in missing_by_currency {
        let idx = indices[0];
        let posting = &mut postings[idx];
        let Some((weight_currency, per_unit)) =
            weight_basis(posting, &currency).filter(|(_, per)| !per.is_zero())
        else {
            return Err(InterpolationError::CannotInferNumber {
                account: posting.account.clone(),
            });
        };
        let residual = residuals.remove(&weight_currency).unwrap_or_default();
        posting.units = Some(IncompleteAmount::complete(-residual / per_unit, currency));
        filled[idx] = true;
    }

    let mut result = transaction.clone();
    result.postings = Vec::with_capacity(postings.len());
    let mut filled_indices = Vec::new();

    for (i, mut posting) in postings.into_iter().enumerate() {
        if posting.units.is_none() {
            // The one posting without an amount takes every leftover currency.
            for (currency, residual) in &residuals {
                if residual.is_zero() {
                    continue;
                }
                let mut leg = Posting {
                    units: Some(IncompleteAmount::Complete(Amount::new(
                        -*residual,
                        currency.clone(),
                    ))),
                    cost: None,
                    price: None,
                    ..posting.clone()
                };
                mark_automatic(&mut leg);
                filled_indices.push(result.postings.len());
                result.postings.push(leg);
            }
            continue;
        }
        if filled[i] {
            mark_automatic(&mut posting);
            filled_indices.push(result.postings.len());
        }
        result.postings.push(posting);
    }

    // Recalculate final residuals
    let residuals = calculate_residual(&result);

    Ok(InterpolationResult {
        transaction: result,
        filled_indices,
        residuals,
    })
}

fn mark_automatic(posting: &mut Posting) {
    posting
        .meta
        .insert(meta::AUTOMATIC.to_string(), MetaValue::Bool(true));
}

/// Currency named by a posting's cost or price.
fn context_currency(posting: &Posting) -> Option<String> {
    posting
        .cost
        .as_ref()
        .and_then(|c| c.currency.clone())
        .or_else(|| posting.price.as_ref().map(|p| p.amount().currency.clone()))
}

/// The currency shared by every complete posting, if there is exactly one.
fn sole_written_currency(transaction: &Transaction) -> Option<String> {
    let mut currencies = transaction
        .postings
        .iter()
        .filter_map(Posting::amount)
        .map(|a| a.currency.as_str());
    let first = currencies.next()?;
    currencies
        .all(|c| c == first)
        .then(|| first.to_string())
}

/// Currency the posting weighs in, and how much one unit weighs.
///
/// `None` when only a total was written, which says nothing per unit.
fn weight_basis(posting: &Posting, currency: &str) -> Option<(String, Decimal)> {
    if let Some(cost) = &posting.cost {
        return match (cost.number_per, &cost.currency) {
            (Some(per), Some(cost_currency)) => Some((cost_currency.clone(), per)),
            _ => None,
        };
    }
    match &posting.price {
        Some(PriceAnnotation::Unit(price)) => Some((price.currency.clone(), price.number)),
        Some(PriceAnnotation::Total(_)) => None,
        None => Some((currency.to_string(), Decimal::ONE)),
    }
}
