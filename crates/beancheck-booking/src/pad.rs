//! Pad directive processing.
//!
//! A `pad` directive inserts a synthetic transaction on the `pad` date so
//! that the next `balance` assertion for the account holds. The synthetic
//! transaction transfers funds from the source account to the target
//! account.
//!
//! ```beancount
//! 2024-01-01 pad Assets:Bank Equity:Opening-Balances
//! 2024-01-02 balance Assets:Bank 1000.00 USD
//! ```
//!
//! This generates a synthetic transaction:
//! ```beancount
//! 2024-01-01 P "(Padding inserted for Balance of 1000.00 USD for difference 1000.00 USD)"
//!   P Assets:Bank              1000.00 USD
//!   P Equity:Opening-Balances -1000.00 USD
//! ```
//!
//! A pad stays active until the next pad for the same account and fills
//! each currency at most once.

use beancheck_core::{
    flags, sort_directives, Amount, Directive, Inventory, Metadata, NaiveDate, Pad, Posting,
    SourceLocation, Transaction,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Narration prefix of every synthetic padding transaction.
pub const PADDING_NARRATION_PREFIX: &str = "(Padding inserted";

/// Result of processing pad directives.
#[derive(Debug, Clone, Default)]
pub struct PadResult {
    /// Synthetic padding transactions generated.
    pub padding_transactions: Vec<Transaction>,
    /// Any errors encountered during pad processing.
    pub errors: Vec<PadError>,
}

/// Error during pad processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PadError {
    /// Date of the error.
    pub date: NaiveDate,
    /// Error message.
    pub message: String,
    /// Account involved.
    pub account: Option<String>,
    /// Metadata of the offending pad (carries its source location).
    pub meta: Metadata,
}

impl PadError {
    /// Create a new pad error.
    pub fn new(date: NaiveDate, message: impl Into<String>) -> Self {
        Self {
            date,
            message: message.into(),
            account: None,
            meta: Metadata::new(),
        }
    }

    /// Add account context.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Where the pad was written, if known.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation<'_>> {
        SourceLocation::from_meta(&self.meta)
    }
}

#[derive(Debug)]
struct PendingPad<'a> {
    pad: &'a Pad,
    /// Currencies this pad has already been consulted for.
    padded: HashSet<String>,
}

impl PendingPad<'_> {
    fn unused_error(&self) -> PadError {
        PadError {
            meta: self.pad.meta.clone(),
            ..PadError::new(self.pad.date, "Unused Pad entry").with_account(&self.pad.account)
        }
    }
}

/// Process pad directives and generate synthetic transactions.
///
/// Walks the directives in date order, tracking the units held by every
/// account. When a balance assertion meets an active pad for its account
/// and the difference exceeds the assertion's tolerance, a padding
/// transaction for the difference is generated.
///
/// A pad that is never consulted by a balance assertion, either because
/// none follows or because another pad replaces it first, is reported as
/// unused.
#[must_use]
pub fn process_pads(directives: &[Directive]) -> PadResult {
    let mut inventories: HashMap<&str, Inventory> = HashMap::new();
    let mut pending_pads: HashMap<&str, PendingPad<'_>> = HashMap::new();
    let mut result = PadResult::default();

    let mut sorted: Vec<&Directive> = directives.iter().collect();
    sorted.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.priority().cmp(&b.priority()))
    });

    for directive in sorted {
        match directive {
            Directive::Transaction(txn) => {
                for posting in &txn.postings {
                    if let Some(units) = posting.amount() {
                        inventories
                            .entry(posting.account.as_str())
                            .or_default()
                            .add(units);
                    }
                }
            }

            Directive::Pad(pad) => {
                let replaced = pending_pads.insert(
                    pad.account.as_str(),
                    PendingPad {
                        pad,
                        padded: HashSet::new(),
                    },
                );
                if let Some(old) = replaced.filter(|old| old.padded.is_empty()) {
                    result.errors.push(old.unused_error());
                }
            }

            Directive::Balance(bal) => {
                let Some(pending) = pending_pads.get_mut(bal.account.as_str()) else {
                    continue;
                };
                if !pending.padded.insert(bal.amount.currency.clone()) {
                    continue;
                }

                let current = inventories
                    .get(bal.account.as_str())
                    .map_or_else(Default::default, |inv| inv.units(&bal.amount.currency));
                let difference = Amount::new(bal.amount.number - current, &bal.amount.currency);
                let tolerance = bal
                    .tolerance
                    .unwrap_or_else(|| bal.amount.inferred_tolerance());
                if difference.number.abs() <= tolerance {
                    continue;
                }

                let pad = pending.pad;
                inventories
                    .entry(pad.account.as_str())
                    .or_default()
                    .add(&difference);
                inventories
                    .entry(pad.source_account.as_str())
                    .or_default()
                    .add(&-&difference);

                debug!(
                    account = %pad.account,
                    difference = %difference,
                    "inserting padding transaction"
                );
                result
                    .padding_transactions
                    .push(create_padding_transaction(pad, &bal.amount, difference));
            }

            _ => {}
        }
    }

    let mut unused: Vec<PadError> = pending_pads
        .values()
        .filter(|pending| pending.padded.is_empty())
        .map(PendingPad::unused_error)
        .collect();
    unused.sort_by_key(|e| e.date);
    result.errors.extend(unused);

    result
}

/// Create a synthetic padding transaction.
fn create_padding_transaction(pad: &Pad, balance: &Amount, difference: Amount) -> Transaction {
    let narration = format!(
        "{PADDING_NARRATION_PREFIX} for Balance of {balance} for difference {difference})"
    );
    let target = Posting::new(&pad.account, difference.clone()).with_flag(flags::FLAG_PADDING);
    let source = Posting::new(&pad.source_account, -difference).with_flag(flags::FLAG_PADDING);
    let mut txn = Transaction::new(pad.date, narration)
        .with_flag(flags::FLAG_PADDING)
        .with_posting(target)
        .with_posting(source);
    txn.meta = pad.meta.clone();
    txn
}

/// Insert padding transactions into `directives`, keeping date order.
///
/// The original pad directives stay in place next to the transactions they
/// generated. Returns the pad errors.
pub fn merge_with_padding(directives: &mut Vec<Directive>) -> Vec<PadError> {
    let result = process_pads(directives);
    if !result.padding_transactions.is_empty() {
        directives.extend(
            result
                .padding_transactions
                .into_iter()
                .map(Directive::Transaction),
        );
        sort_directives(directives);
    }
    result.errors
}
