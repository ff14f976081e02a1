//! Transactions and postings marked for review.

use crate::flags;
use beancheck_core::flags::FLAG_WARNING;
use beancheck_core::{Posting, SourceLocation, Transaction};
use serde::Serialize;

/// Help text used when nothing better describes the flagged object.
pub const PLACEHOLDER_HELP: &str = r"¯\_(ツ)_/¯";

/// One flagged transaction or posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagRecord {
    /// File of the flagged object.
    pub file: String,
    /// Line of the flagged object.
    pub line: usize,
    /// `<Transaction|Posting> has flag <NAME> (<help>)`.
    pub message: String,
    /// The flag itself.
    pub flag: char,
}

impl FlagRecord {
    fn new(
        kind: &str,
        flag: char,
        location: Option<SourceLocation<'_>>,
        help: &[Option<&str>],
    ) -> Self {
        let (file, line) = location.map_or(("", 0), |loc| (loc.file, loc.line));
        let help = help
            .iter()
            .flatten()
            .find(|text| !text.is_empty())
            .copied()
            .unwrap_or(PLACEHOLDER_HELP);
        Self {
            file: file.to_string(),
            line,
            message: format!("{kind} has flag {} ({help})", flags::resolve(flag)),
            flag,
        }
    }
}

/// Record for `txn` if it needs review.
#[must_use]
pub fn transaction_flag(txn: &Transaction) -> Option<FlagRecord> {
    (txn.flag == FLAG_WARNING).then(|| {
        FlagRecord::new(
            "Transaction",
            txn.flag,
            txn.location(),
            &[Some(txn.narration.as_str()), txn.payee.as_deref()],
        )
    })
}

/// Record for `posting` if it needs review.
#[must_use]
pub fn posting_flag(posting: &Posting) -> Option<FlagRecord> {
    let flag = posting.flag.filter(|&f| f == FLAG_WARNING)?;
    Some(FlagRecord::new(
        "Posting",
        flag,
        posting.location(),
        &[Some(posting.account.as_str())],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beancheck_core::meta::{set_filename, set_lineno};
    use beancheck_core::NaiveDate;

    fn txn(narration: &str) -> Transaction {
        let mut txn = Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), narration)
            .with_flag('!');
        set_filename(&mut txn.meta, "main.beancount");
        set_lineno(&mut txn.meta, 7);
        txn
    }

    #[test]
    fn test_transaction_uses_narration() {
        let record = transaction_flag(&txn("Review me").with_payee("Shop")).unwrap();
        assert_eq!(
            record,
            FlagRecord {
                file: "main.beancount".to_string(),
                line: 7,
                message: "Transaction has flag WARNING (Review me)".to_string(),
                flag: '!',
            }
        );
    }

    #[test]
    fn test_transaction_falls_back_to_payee_then_placeholder() {
        let record = transaction_flag(&txn("").with_payee("Shop")).unwrap();
        assert_eq!(record.message, "Transaction has flag WARNING (Shop)");

        let record = transaction_flag(&txn("")).unwrap();
        assert_eq!(record.message, r"Transaction has flag WARNING (¯\_(ツ)_/¯)");
    }

    #[test]
    fn test_cleared_transaction_not_flagged() {
        assert!(transaction_flag(&txn("Fine").with_flag('*')).is_none());
    }

    #[test]
    fn test_posting_uses_account() {
        let mut posting = Posting::auto("Assets:Cash").with_flag('!');
        set_lineno(&mut posting.meta, 9);

        let record = posting_flag(&posting).unwrap();
        assert_eq!(record.file, "");
        assert_eq!(record.line, 9);
        assert_eq!(record.message, "Posting has flag WARNING (Assets:Cash)");
    }

    #[test]
    fn test_posting_without_location() {
        let record = posting_flag(&Posting::auto("Assets:Cash").with_flag('!')).unwrap();
        assert_eq!((record.file.as_str(), record.line), ("", 0));
        assert!(posting_flag(&Posting::auto("Assets:Cash").with_flag('*')).is_none());
        assert!(posting_flag(&Posting::auto("Assets:Cash")).is_none());
    }
}
