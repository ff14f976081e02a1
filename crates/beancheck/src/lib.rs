//! Ledger summaries for editor integrations.
//!
//! `beancheck` loads a ledger, then prints four compact JSON documents on
//! four lines of standard output:
//!
//! 1. the errors found while loading, booking and validating the ledger
//! 2. the accounts, commodities, payees, narrations, tags and links it uses
//! 3. the transactions and postings flagged `!` for review
//! 4. the amounts inferred for postings written without one, by location
//!
//! # Example Usage
//!
//! ```bash
//! beancheck ledger.beancount
//! beancheck ledger.beancount --payeeNarration
//! ```
//!
//! The same pipeline is available as a library:
//!
//! ```no_run
//! use beancheck::summary::{summarize, SummaryOptions};
//! use std::path::Path;
//!
//! let ledger = beancheck::ledger::load(Path::new("ledger.beancount"))?;
//! let summary = summarize(&ledger.entries, &SummaryOptions::default());
//! println!("{} accounts", summary.accounts.len());
//! # Ok::<(), beancheck_loader::LoadError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod flags;
pub mod ledger;
pub mod output;
pub mod realize;
pub mod summary;
