//! The ledger summary.
//!
//! [`summarize`] walks the booked entries once, in the order given, and
//! feeds each one to the collectors:
//!
//! - [`AccountRegistry`]: open and close dates per account
//! - [`AggregateSets`]: commodities, payees, narrations, tags and links
//! - [`FlagRecord`]s: transactions and postings flagged `!`
//! - [`AutomaticIndex`]: amounts inferred for postings written without one
//!
//! Balances are attached afterwards from the text balance report with
//! [`Summary::apply_balance_report`].

mod accounts;
mod automatics;
mod balances;
mod flagged;
mod sets;

pub use accounts::{AccountRecord, AccountRegistry};
pub use automatics::AutomaticIndex;
pub use balances::{apply_balance_report, parse_balance_line};
pub use flagged::{posting_flag, transaction_flag, FlagRecord, PLACEHOLDER_HELP};
pub use sets::{is_padding, AggregateSets, BLANK_VALUES};

use beancheck_core::Directive;
use tracing::debug;

/// Options controlling what the summary collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Collect payees and narrations.
    pub payee_narration: bool,
}

/// Everything collected from one pass over the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Opened accounts.
    pub accounts: AccountRegistry,
    /// Deduplicated string sets.
    pub sets: AggregateSets,
    /// Flagged transactions and postings, in ledger order.
    pub flagged: Vec<FlagRecord>,
    /// Inferred amounts by location.
    pub automatics: AutomaticIndex,
}

impl Summary {
    /// Feed one entry to the collectors.
    pub fn classify(&mut self, entry: &Directive, options: &SummaryOptions) {
        match entry {
            Directive::Transaction(txn) => {
                self.flagged.extend(transaction_flag(txn));
                self.sets.collect(txn, options.payee_narration);
                for posting in &txn.postings {
                    self.flagged.extend(posting_flag(posting));
                    self.automatics.record(posting);
                }
            }
            Directive::Open(open) => {
                self.accounts
                    .on_open(&open.account, open.date, &open.currencies);
            }
            Directive::Close(close) => {
                if !self.accounts.on_close(&close.account, close.date) {
                    debug!(account = %close.account, "close of unknown account ignored");
                }
            }
            _ => {}
        }
    }

    /// Attach balances from the lines of a balance report.
    pub fn apply_balance_report<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        apply_balance_report(&mut self.accounts, lines)
    }
}

/// Summarize `entries` in a single pass.
#[must_use]
pub fn summarize(entries: &[Directive], options: &SummaryOptions) -> Summary {
    let mut summary = Summary::default();
    for entry in entries {
        summary.classify(entry, options);
    }
    summary.sets.cleanup();
    debug!(
        accounts = summary.accounts.len(),
        flagged = summary.flagged.len(),
        "summary collected"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use beancheck_core::meta::{set_filename, set_lineno, AUTOMATIC};
    use beancheck_core::{Amount, Close, MetaValue, NaiveDate, Open, Posting, Transaction};
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn entries() -> Vec<Directive> {
        let mut cash = Posting::new("Assets:Cash", Amount::new(dec!(-4.50), "EUR"))
            .with_meta(AUTOMATIC, MetaValue::Bool(true));
        set_filename(&mut cash.meta, "main.beancount");
        set_lineno(&mut cash.meta, 6);

        let mut coffee = Transaction::new(date(2), "Coffee")
            .with_flag('!')
            .with_payee("Cafe")
            .with_tag("trip")
            .with_posting(
                Posting::new("Expenses:Food", Amount::new(dec!(4.50), "EUR")).with_flag('!'),
            )
            .with_posting(cash);
        set_filename(&mut coffee.meta, "main.beancount");
        set_lineno(&mut coffee.meta, 4);

        vec![
            Directive::Open(Open::new(date(1), "Assets:Cash").with_currencies(vec!["EUR".into()])),
            Directive::Open(Open::new(date(1), "Expenses:Food")),
            Directive::Transaction(coffee),
            Directive::Close(Close::new(date(3), "Assets:Cash")),
            Directive::Close(Close::new(date(3), "Assets:Ghost")),
        ]
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&entries(), &SummaryOptions::default());

        assert_eq!(summary.accounts.len(), 2);
        let cash = summary.accounts.get("Assets:Cash").unwrap();
        assert_eq!(cash.open, "2024-01-01");
        assert_eq!(cash.close, "2024-01-03");
        assert_eq!(cash.currencies, vec!["EUR"]);
        assert!(summary.accounts.get("Assets:Ghost").is_none());

        assert!(summary.sets.payees.is_empty());
        assert!(summary.sets.tags.contains("trip"));
        assert!(summary.sets.commodities.contains("EUR"));

        let messages: Vec<_> = summary.flagged.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Transaction has flag WARNING (Coffee)",
                "Posting has flag WARNING (Expenses:Food)",
            ]
        );
        assert_eq!(summary.flagged[0].line, 4);

        assert_eq!(
            summary.automatics.get("main.beancount", 6).unwrap(),
            ["-4.50 EUR"]
        );
    }

    #[test]
    fn test_payee_narration_mode() {
        let options = SummaryOptions {
            payee_narration: true,
        };
        let summary = summarize(&entries(), &options);
        assert!(summary.sets.payees.contains("Cafe"));
        assert!(summary.sets.narrations.contains("Coffee"));
    }

    #[test]
    fn test_apply_balance_report() {
        let mut summary = summarize(&entries(), &SummaryOptions::default());
        let patched = summary.apply_balance_report(["Assets:Cash  -4.50 EUR", "Assets"]);
        assert_eq!(patched, 1);
        assert_eq!(
            summary.accounts.get("Assets:Cash").unwrap().balances,
            vec!["-4.50"]
        );
    }
}
