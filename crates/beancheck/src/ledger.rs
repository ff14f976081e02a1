//! Loading a ledger into booked, validated entries.
//!
//! [`load`] runs the whole front half of the pipeline:
//!
//! 1. read the root file and its includes
//! 2. sort entries by date, then by directive type
//! 3. interpolate missing posting amounts (in parallel)
//! 4. insert padding transactions for `pad` directives
//! 5. validate the result
//!
//! Problems in the ledger never stop the load; they are collected as
//! [`LedgerError`]s next to the entries that did load.

use beancheck_booking::{interpolate, merge_with_padding, InterpolationError, PadError};
use beancheck_core::{sort_directives, Directive, DisplayContext, SourceLocation};
use beancheck_loader::{LoadError, Options};
use beancheck_validate::{validate_with_options, ValidationError, ValidationOptions};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// A problem found in the ledger, pointing at its source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{file}:{line}: {message}")]
pub struct LedgerError {
    /// File the problem was found in.
    pub file: String,
    /// 1-based line, 0 when unknown.
    pub line: usize,
    /// Description.
    pub message: String,
}

impl LedgerError {
    /// Create a new error.
    pub fn new(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    fn at(location: Option<SourceLocation<'_>>, message: impl Into<String>) -> Self {
        let (file, line) = location.map_or(("", 0), |loc| (loc.file, loc.line));
        Self::new(file, line, message)
    }
}

impl From<&LoadError> for LedgerError {
    fn from(error: &LoadError) -> Self {
        let (file, line) = error
            .location()
            .map_or_else(|| (String::new(), 0), |(path, line)| (path.display().to_string(), line));
        Self::new(file, line, error.to_string())
    }
}

impl From<&PadError> for LedgerError {
    fn from(error: &PadError) -> Self {
        Self::at(error.location(), error.to_string())
    }
}

impl From<&ValidationError> for LedgerError {
    fn from(error: &ValidationError) -> Self {
        let (file, line) = error
            .location
            .clone()
            .unwrap_or_else(|| (String::new(), 0));
        Self::new(file, line, error.to_string())
    }
}

/// A loaded ledger.
#[derive(Debug)]
pub struct Ledger {
    /// Booked entries in date order, padding transactions included.
    pub entries: Vec<Directive>,
    /// Every problem found, in pipeline order.
    pub errors: Vec<LedgerError>,
    /// Options collected from `option` lines.
    pub options: Options,
}

impl Ledger {
    /// Number formatting learned from the amounts written in the ledger.
    ///
    /// Interpolated amounts and padding transactions are left out: their
    /// precision was not chosen by whoever wrote the ledger.
    #[must_use]
    pub fn display_context(&self) -> DisplayContext {
        let mut dcontext = DisplayContext::new().with_commas(self.options.render_commas);
        for entry in &self.entries {
            match entry {
                Directive::Transaction(txn) if txn.flag != beancheck_core::flags::FLAG_PADDING => {
                    for posting in txn.postings.iter().filter(|p| !p.is_automatic()) {
                        if let Some(units) = posting.amount() {
                            dcontext.update(units.number, &units.currency);
                        }
                        if let Some(price) = &posting.price {
                            let amount = price.amount();
                            dcontext.update(amount.number, &amount.currency);
                        }
                        if let Some(cost) = &posting.cost {
                            if let (Some(per), Some(currency)) = (cost.number_per, &cost.currency) {
                                dcontext.update(per, currency);
                            }
                        }
                    }
                }
                Directive::Balance(bal) => dcontext.update(bal.amount.number, &bal.amount.currency),
                Directive::Price(price) => {
                    dcontext.update(price.amount.number, &price.amount.currency);
                }
                _ => {}
            }
        }
        dcontext
    }
}

/// Load, book and validate the ledger at `path`.
///
/// # Errors
///
/// Returns a [`LoadError`] only when the root file cannot be read. Every
/// other problem ends up in [`Ledger::errors`].
pub fn load(path: &Path) -> Result<Ledger, LoadError> {
    info!(path = %path.display(), "loading ledger");
    let loaded = beancheck_loader::load(path)?;

    let mut errors: Vec<LedgerError> = loaded.errors.iter().map(LedgerError::from).collect();
    let mut entries = loaded.directives;
    sort_directives(&mut entries);

    let interpolation_errors: Vec<LedgerError> = entries
        .par_iter_mut()
        .filter_map(|directive| {
            let Directive::Transaction(txn) = directive else {
                return None;
            };
            match interpolate(txn) {
                Ok(result) => {
                    *txn = result.transaction;
                    None
                }
                Err(e) => Some(interpolation_error(txn.location(), &e)),
            }
        })
        .collect();
    if !interpolation_errors.is_empty() {
        debug!(count = interpolation_errors.len(), "interpolation failed");
    }
    errors.extend(interpolation_errors);

    let pad_errors = merge_with_padding(&mut entries);
    errors.extend(pad_errors.iter().map(LedgerError::from));

    let validation = ValidationOptions {
        check_documents: true,
        document_base: path
            .canonicalize()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf)),
        ..Default::default()
    };
    let validation_errors = validate_with_options(&entries, validation);
    errors.extend(validation_errors.iter().map(LedgerError::from));

    info!(
        entries = entries.len(),
        errors = errors.len(),
        "ledger loaded"
    );
    Ok(Ledger {
        entries,
        errors,
        options: loaded.options,
    })
}

fn interpolation_error(location: Option<SourceLocation<'_>>, error: &InterpolationError) -> LedgerError {
    LedgerError::at(location, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ledger_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_interpolates_and_validates() {
        let file = ledger_file(
            "2024-01-01 open Assets:Cash\n\
             2024-01-01 open Expenses:Food\n\
             2024-01-02 * \"Lunch\"\n  \
               Expenses:Food  12.50 USD\n  \
               Assets:Cash\n",
        );

        let ledger = load(file.path()).unwrap();
        assert!(ledger.errors.is_empty(), "{:?}", ledger.errors);

        let txn = ledger.entries[2].as_transaction().unwrap();
        let cash = &txn.postings[1];
        assert!(cash.is_automatic());
        assert_eq!(cash.amount().unwrap().to_string(), "-12.50 USD");
        assert_eq!(cash.location().unwrap().line, 5);
    }

    #[test]
    fn test_errors_carry_file_and_line() {
        let file = ledger_file(
            "2024-01-01 open Assets:Cash\n\
             2024-01-02 * \"Lunch\"\n  \
               Expenses:Food  12.50 USD\n  \
               Assets:Cash\n",
        );
        let expected_file = file.path().canonicalize().unwrap().display().to_string();

        let ledger = load(file.path()).unwrap();
        assert_eq!(ledger.errors.len(), 1);
        let error = &ledger.errors[0];
        assert_eq!(error.file, expected_file);
        assert_eq!(error.line, 2);
        assert_eq!(
            error.message,
            "Invalid reference to unknown account 'Expenses:Food'"
        );
    }

    #[test]
    fn test_pad_inserts_padding_transaction() {
        let file = ledger_file(
            "2024-01-01 open Assets:Bank\n\
             2024-01-01 open Equity:Opening\n\
             2024-01-01 pad Assets:Bank Equity:Opening\n\
             2024-01-02 balance Assets:Bank 250.00 USD\n",
        );

        let ledger = load(file.path()).unwrap();
        assert!(ledger.errors.is_empty(), "{:?}", ledger.errors);
        let padding: Vec<_> = ledger
            .entries
            .iter()
            .filter_map(Directive::as_transaction)
            .collect();
        assert_eq!(padding.len(), 1);
        assert_eq!(
            padding[0].narration,
            "(Padding inserted for Balance of 250.00 USD for difference 250.00 USD)"
        );
        assert_eq!(padding[0].location().unwrap().line, 3);
    }

    #[test]
    fn test_display_context_uses_written_precision() {
        let file = ledger_file(
            "option \"render_commas\" \"TRUE\"\n\
             2024-01-01 open Assets:Cash\n\
             2024-01-01 open Income:Job\n\
             2024-01-02 * \"Pay\"\n  \
               Assets:Cash  1500.00 USD\n  \
               Income:Job\n",
        );

        let ledger = load(file.path()).unwrap();
        let dcontext = ledger.display_context();
        assert_eq!(dcontext.precision("USD"), Some(2));
        assert_eq!(dcontext.format(rust_decimal_macros::dec!(-1500), "USD"), "-1,500.00");
    }

    #[test]
    fn test_missing_root_file_is_fatal() {
        let err = load(Path::new("/nonexistent/books.beancount")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
