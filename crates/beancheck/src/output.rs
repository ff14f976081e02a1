//! The four-line JSON report.
//!
//! Each document is rendered compact, with no whitespace between tokens,
//! on its own line:
//!
//! ```text
//! [{"file":"...","line":3,"message":"..."}]
//! {"accounts":{...},"commodities":[...],"payees":[...],"narrations":[...],"tags":[...],"links":[...]}
//! [{"file":"...","line":7,"message":"Transaction has flag WARNING (...)","flag":"!"}]
//! {"<file>":{"<line>":["-12.50 USD"]}}
//! ```

use crate::ledger::LedgerError;
use crate::summary::{AccountRegistry, Summary};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Serialize)]
struct Aggregate<'a> {
    accounts: &'a AccountRegistry,
    commodities: &'a BTreeSet<String>,
    payees: &'a BTreeSet<String>,
    narrations: &'a BTreeSet<String>,
    tags: &'a BTreeSet<String>,
    links: &'a BTreeSet<String>,
}

impl<'a> From<&'a Summary> for Aggregate<'a> {
    fn from(summary: &'a Summary) -> Self {
        Self {
            accounts: &summary.accounts,
            commodities: &summary.sets.commodities,
            payees: &summary.sets.payees,
            narrations: &summary.sets.narrations,
            tags: &summary.sets.tags,
            links: &summary.sets.links,
        }
    }
}

/// Render the errors and the summary as four compact JSON documents.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn render(errors: &[LedgerError], summary: &Summary) -> serde_json::Result<[String; 4]> {
    Ok([
        serde_json::to_string(errors)?,
        serde_json::to_string(&Aggregate::from(summary))?,
        serde_json::to_string(&summary.flagged)?,
        serde_json::to_string(&summary.automatics)?,
    ])
}
