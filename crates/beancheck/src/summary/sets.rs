//! Commodities, payees, narrations, tags and links seen in the ledger.

use beancheck_booking::PADDING_NARRATION_PREFIX;
use beancheck_core::Transaction;
use serde::Serialize;
use std::collections::BTreeSet;

/// Values never reported as a payee or narration.
pub const BLANK_VALUES: [&str; 2] = ["", "None"];

/// Deduplicated string sets, in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateSets {
    /// Currencies of every posting.
    pub commodities: BTreeSet<String>,
    /// Payees, when payee collection is on.
    pub payees: BTreeSet<String>,
    /// Narrations, when narration collection is on.
    pub narrations: BTreeSet<String>,
    /// Tags.
    pub tags: BTreeSet<String>,
    /// Links.
    pub links: BTreeSet<String>,
}

impl AggregateSets {
    /// Collect from one transaction.
    ///
    /// Padding transactions contribute their commodities only.
    pub fn collect(&mut self, txn: &Transaction, payee_narration: bool) {
        if payee_narration {
            if let Some(payee) = txn.payee.as_deref().filter(|p| !p.is_empty()) {
                self.payees.insert(payee.to_string());
            }
        }

        if !is_padding(txn) {
            if payee_narration && !txn.narration.is_empty() {
                self.narrations.insert(txn.narration.clone());
            }
            self.tags.extend(txn.tags.iter().cloned());
            self.links.extend(txn.links.iter().cloned());
        }

        for posting in &txn.postings {
            if let Some(currency) = posting.units.as_ref().and_then(|u| u.currency()) {
                if !currency.is_empty() {
                    self.commodities.insert(currency.to_string());
                }
            }
        }
    }

    /// Drop [`BLANK_VALUES`] from payees and narrations.
    pub fn cleanup(&mut self) {
        for blank in BLANK_VALUES {
            self.payees.remove(blank);
            self.narrations.remove(blank);
        }
    }
}

/// Whether `txn` was inserted by a `pad` directive.
#[must_use]
pub fn is_padding(txn: &Transaction) -> bool {
    txn.narration.starts_with(PADDING_NARRATION_PREFIX)
}
