//! Ledger validation rules.
//!
//! Runs over the booked entries (interpolated, pads expanded) in date
//! order and checks:
//!
//! - Account lifecycle (opened before use, not used after close)
//! - Balance assertions, summed over the account and its sub-accounts
//! - Transaction balancing
//! - Currency constraints
//! - Document files
//!
//! # Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | E1001 | Account not opened |
//! | E1002 | Account already open |
//! | E1003 | Account already closed |
//! | E2001 | Balance assertion failed |
//! | E3001 | Transaction does not balance |
//! | E3003 | Transaction has no postings |
//! | E5001 | Currency not declared |
//! | E5002 | Currency not allowed in account |
//! | E8001 | Document file not found |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use beancheck_core::{
    Balance, Close, Directive, Document, Inventory, Metadata, NaiveDate, Open, Pad,
    SourceLocation, Transaction,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === Account Errors (E1xxx) ===
    /// E1001: Account used before it was opened.
    AccountNotOpen,
    /// E1002: Account opened more than once.
    AccountAlreadyOpen,
    /// E1003: Account used or closed after close.
    AccountClosed,

    // === Balance Errors (E2xxx) ===
    /// E2001: Balance assertion failed.
    BalanceAssertionFailed,

    // === Transaction Errors (E3xxx) ===
    /// E3001: Transaction does not balance.
    TransactionUnbalanced,
    /// E3003: Transaction has no postings.
    NoPostings,

    // === Currency Errors (E5xxx) ===
    /// E5001: Currency used without a commodity declaration.
    UndeclaredCurrency,
    /// E5002: Currency not in the account's allowed list.
    CurrencyNotAllowed,

    // === Document Errors (E8xxx) ===
    /// E8001: Document file not found.
    DocumentNotFound,
}

impl ErrorCode {
    /// Get the error code string (e.g., "E1001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AccountNotOpen => "E1001",
            Self::AccountAlreadyOpen => "E1002",
            Self::AccountClosed => "E1003",
            Self::BalanceAssertionFailed => "E2001",
            Self::TransactionUnbalanced => "E3001",
            Self::NoPostings => "E3003",
            Self::UndeclaredCurrency => "E5001",
            Self::CurrencyNotAllowed => "E5002",
            Self::DocumentNotFound => "E8001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Date of the directive that caused the error.
    pub date: NaiveDate,
    /// File and line of that directive, when the loader recorded them.
    pub location: Option<(String, usize)>,
    /// Additional context.
    pub context: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            code,
            message: message.into(),
            date,
            location: None,
            context: None,
        }
    }

    /// Point the error at the directive owning `meta`.
    #[must_use]
    pub fn at(mut self, meta: &Metadata) -> Self {
        self.location =
            SourceLocation::from_meta(meta).map(|loc| (loc.file.to_string(), loc.line));
        self
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Account state for tracking lifecycle.
#[derive(Debug, Clone)]
struct AccountState {
    /// Date opened.
    opened: NaiveDate,
    /// Date closed (if closed).
    closed: Option<NaiveDate>,
    /// Allowed currencies (empty = any).
    currencies: HashSet<String>,
}

/// Validation options.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Whether to require commodity declarations.
    pub require_commodities: bool,
    /// Whether to check if document files exist.
    pub check_documents: bool,
    /// Base directory for resolving relative document paths.
    pub document_base: Option<PathBuf>,
}

/// Ledger state for validation.
#[derive(Debug, Default)]
pub struct LedgerState {
    accounts: HashMap<String, AccountState>,
    inventories: HashMap<String, Inventory>,
    commodities: HashSet<String>,
    options: ValidationOptions,
}

impl LedgerState {
    /// Create a new ledger state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new ledger state with options.
    #[must_use]
    pub fn with_options(options: ValidationOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Get the inventory for an account, not counting sub-accounts.
    #[must_use]
    pub fn inventory(&self, account: &str) -> Option<&Inventory> {
        self.inventories.get(account)
    }

    /// Units of `currency` held by `account` and all its sub-accounts.
    #[must_use]
    pub fn subtree_units(&self, account: &str, currency: &str) -> Decimal {
        let prefix = format!("{account}:");
        self.inventories
            .iter()
            .filter(|(name, _)| *name == account || name.starts_with(&prefix))
            .map(|(_, inv)| inv.units(currency))
            .sum()
    }

    /// Get all account names.
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }
}

/// Validate a stream of directives.
///
/// Returns a list of validation errors found.
#[must_use]
pub fn validate(directives: &[Directive]) -> Vec<ValidationError> {
    validate_with_options(directives, ValidationOptions::default())
}

/// Validate a stream of directives with custom options.
///
/// Directives are visited in date order; directives sharing a date keep
/// their relative order, so callers should pass them through
/// [`beancheck_core::sort_directives`] first.
#[must_use]
pub fn validate_with_options(
    directives: &[Directive],
    options: ValidationOptions,
) -> Vec<ValidationError> {
    let mut state = LedgerState::with_options(options);
    let mut errors = Vec::new();

    let mut sorted: Vec<&Directive> = directives.iter().collect();
    sorted.sort_by_key(|d| d.date());

    for directive in sorted {
        match directive {
            Directive::Open(open) => {
                validate_open(&mut state, open, &mut errors);
            }
            Directive::Close(close) => {
                validate_close(&mut state, close, &mut errors);
            }
            Directive::Transaction(txn) => {
                validate_transaction(&mut state, txn, &mut errors);
            }
            Directive::Balance(bal) => {
                validate_balance(&state, bal, &mut errors);
            }
            Directive::Commodity(comm) => {
                state.commodities.insert(comm.currency.clone());
            }
            Directive::Pad(pad) => {
                validate_pad(&state, pad, &mut errors);
            }
            Directive::Document(doc) => {
                validate_document(&state, doc, &mut errors);
            }
            _ => {}
        }
    }

    errors
}

fn validate_open(state: &mut LedgerState, open: &Open, errors: &mut Vec<ValidationError>) {
    if let Some(existing) = state.accounts.get(&open.account) {
        errors.push(
            ValidationError::new(
                ErrorCode::AccountAlreadyOpen,
                format!(
                    "Duplicate open directive for {} (opened on {})",
                    open.account, existing.opened
                ),
                open.date,
            )
            .at(&open.meta),
        );
        return;
    }

    state.accounts.insert(
        open.account.clone(),
        AccountState {
            opened: open.date,
            closed: None,
            currencies: open.currencies.iter().cloned().collect(),
        },
    );
}

fn validate_close(state: &mut LedgerState, close: &Close, errors: &mut Vec<ValidationError>) {
    match state.accounts.get_mut(&close.account) {
        Some(account_state) if account_state.closed.is_some() => {
            errors.push(
                ValidationError::new(
                    ErrorCode::AccountClosed,
                    format!("Duplicate close directive for {}", close.account),
                    close.date,
                )
                .at(&close.meta),
            );
        }
        Some(account_state) => account_state.closed = Some(close.date),
        None => {
            errors.push(
                ValidationError::new(
                    ErrorCode::AccountNotOpen,
                    format!("Unopened account {} is being closed", close.account),
                    close.date,
                )
                .at(&close.meta),
            );
        }
    }
}

/// Lifecycle check shared by every directive that names an account.
fn check_account_active<'a>(
    state: &'a LedgerState,
    account: &str,
    date: NaiveDate,
    meta: &Metadata,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a AccountState> {
    let Some(account_state) = state.accounts.get(account) else {
        errors.push(
            ValidationError::new(
                ErrorCode::AccountNotOpen,
                format!("Invalid reference to unknown account '{account}'"),
                date,
            )
            .at(meta),
        );
        return None;
    };

    if date < account_state.opened {
        errors.push(
            ValidationError::new(
                ErrorCode::AccountNotOpen,
                format!(
                    "Account {account} used on {date} but not opened until {}",
                    account_state.opened
                ),
                date,
            )
            .at(meta),
        );
    }
    if let Some(closed) = account_state.closed.filter(|closed| date > *closed) {
        errors.push(
            ValidationError::new(
                ErrorCode::AccountClosed,
                format!("Account {account} used on {date} but was closed on {closed}"),
                date,
            )
            .at(meta),
        );
    }
    Some(account_state)
}

fn validate_transaction(
    state: &mut LedgerState,
    txn: &Transaction,
    errors: &mut Vec<ValidationError>,
) {
    if txn.postings.is_empty() {
        errors.push(
            ValidationError::new(
                ErrorCode::NoPostings,
                "Transaction has no postings",
                txn.date,
            )
            .at(&txn.meta),
        );
        return;
    }

    // The same account may appear on several postings; report it once.
    let mut checked: HashSet<&str> = HashSet::new();
    for posting in &txn.postings {
        let first_use = checked.insert(posting.account.as_str());
        let account_state = if first_use {
            check_account_active(state, &posting.account, txn.date, &txn.meta, errors)
        } else {
            state.accounts.get(&posting.account)
        };

        let Some(units) = posting.amount() else {
            continue;
        };
        if let Some(account_state) = account_state {
            if !account_state.currencies.is_empty()
                && !account_state.currencies.contains(&units.currency)
            {
                errors.push(
                    ValidationError::new(
                        ErrorCode::CurrencyNotAllowed,
                        format!(
                            "Invalid currency {} for account '{}'",
                            units.currency, posting.account
                        ),
                        txn.date,
                    )
                    .at(&txn.meta),
                );
            }
        }
        if state.options.require_commodities && !state.commodities.contains(&units.currency) {
            errors.push(
                ValidationError::new(
                    ErrorCode::UndeclaredCurrency,
                    format!("Currency {} not declared", units.currency),
                    txn.date,
                )
                .at(&txn.meta),
            );
        }
    }

    let tolerances = beancheck_booking::transaction_tolerances(txn);
    for (currency, residual) in beancheck_booking::calculate_residual(txn) {
        let tolerance = tolerances
            .get(&currency)
            .copied()
            .unwrap_or(beancheck_booking::DEFAULT_TOLERANCE);
        if residual.abs() > tolerance {
            errors.push(
                ValidationError::new(
                    ErrorCode::TransactionUnbalanced,
                    format!("Transaction does not balance: ({residual} {currency})"),
                    txn.date,
                )
                .at(&txn.meta),
            );
        }
    }

    for posting in &txn.postings {
        if let Some(units) = posting.amount() {
            state
                .inventories
                .entry(posting.account.clone())
                .or_default()
                .add(units);
        }
    }
}

fn validate_pad(state: &LedgerState, pad: &Pad, errors: &mut Vec<ValidationError>) {
    check_account_active(state, &pad.account, pad.date, &pad.meta, errors);
    if pad.source_account != pad.account {
        check_account_active(state, &pad.source_account, pad.date, &pad.meta, errors);
    }
}

fn validate_balance(state: &LedgerState, bal: &Balance, errors: &mut Vec<ValidationError>) {
    if check_account_active(state, &bal.account, bal.date, &bal.meta, errors).is_none() {
        return;
    }

    let actual = state.subtree_units(&bal.account, &bal.amount.currency);
    let expected = bal.amount.number;
    let tolerance = bal
        .tolerance
        .unwrap_or_else(|| bal.amount.inferred_tolerance());
    let difference = actual - expected;

    if difference.abs() > tolerance {
        let direction = if difference.is_sign_positive() {
            "too much"
        } else {
            "too little"
        };
        errors.push(
            ValidationError::new(
                ErrorCode::BalanceAssertionFailed,
                format!(
                    "Balance failed for '{}': expected {} != accumulated {} {} ({} {direction})",
                    bal.account,
                    bal.amount,
                    actual,
                    bal.amount.currency,
                    difference.abs()
                ),
                bal.date,
            )
            .at(&bal.meta),
        );
    }
}

fn validate_document(state: &LedgerState, doc: &Document, errors: &mut Vec<ValidationError>) {
    check_account_active(state, &doc.account, doc.date, &doc.meta, errors);

    if state.options.check_documents {
        let doc_path = Path::new(&doc.path);
        let full_path = match &state.options.document_base {
            Some(base) if doc_path.is_relative() => base.join(doc_path),
            _ => doc_path.to_path_buf(),
        };

        if !full_path.exists() {
            errors.push(
                ValidationError::new(
                    ErrorCode::DocumentNotFound,
                    format!("File does not exist: '{}'", full_path.display()),
                    doc.date,
                )
                .at(&doc.meta),
            );
        }
    }
}
