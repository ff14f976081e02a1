//! Account lifecycle registry.

use beancheck_core::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// What the summary reports about one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    /// Open date, `YYYY-MM-DD`.
    pub open: String,
    /// Close date, empty while the account is open.
    pub close: String,
    /// Currencies the account is constrained to, as written.
    pub currencies: Vec<String>,
    /// Balance numbers from the balance report, in report order.
    #[serde(rename = "balance")]
    pub balances: Vec<String>,
}

/// Accounts keyed by their name, used verbatim.
///
/// A record exists exactly for the accounts an `open` was seen for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccountRegistry {
    records: BTreeMap<String, AccountRecord>,
}

impl AccountRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an `open`. A later `open` of the same account replaces the
    /// earlier record, balances and close date included.
    pub fn on_open(&mut self, account: &str, date: NaiveDate, currencies: &[String]) {
        if account.is_empty() {
            return;
        }
        self.records.insert(
            account.to_string(),
            AccountRecord {
                open: date.to_string(),
                currencies: currencies.to_vec(),
                ..AccountRecord::default()
            },
        );
    }

    /// Record a `close`. Returns false, changing nothing, for an account
    /// that was never opened.
    pub fn on_close(&mut self, account: &str, date: NaiveDate) -> bool {
        match self.records.get_mut(account) {
            Some(record) => {
                record.close = date.to_string();
                true
            }
            None => false,
        }
    }

    /// Append a balance token. Returns false for unknown accounts.
    pub fn patch_balance(&mut self, account: &str, token: &str) -> bool {
        match self.records.get_mut(account) {
            Some(record) => {
                record.balances.push(token.to_string());
                true
            }
            None => false,
        }
    }

    /// Look up one account.
    #[must_use]
    pub fn get(&self, account: &str) -> Option<&AccountRecord> {
        self.records.get(account)
    }

    /// Iterate in account name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccountRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no account was opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_open_close() {
        let mut registry = AccountRegistry::new();
        registry.on_open("Assets:Cash", date(1, 1), &["USD".to_string()]);
        assert!(registry.on_close("Assets:Cash", date(6, 30)));

        let record = registry.get("Assets:Cash").unwrap();
        assert_eq!(record.open, "2024-01-01");
        assert_eq!(record.close, "2024-06-30");
        assert_eq!(record.currencies, vec!["USD"]);
        assert!(record.balances.is_empty());
    }

    #[test]
    fn test_close_unknown_is_dropped() {
        let mut registry = AccountRegistry::new();
        assert!(!registry.on_close("Assets:Ghost", date(1, 1)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_account_name_ignored() {
        let mut registry = AccountRegistry::new();
        registry.on_open("", date(1, 1), &[]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_open_wins() {
        let mut registry = AccountRegistry::new();
        registry.on_open("Assets:Cash", date(1, 1), &["USD".to_string()]);
        registry.on_close("Assets:Cash", date(2, 1));
        registry.patch_balance("Assets:Cash", "10.00");
        registry.on_open("Assets:Cash", date(3, 1), &[]);

        let record = registry.get("Assets:Cash").unwrap();
        assert_eq!(record.open, "2024-03-01");
        assert_eq!(record.close, "");
        assert!(record.currencies.is_empty());
        assert!(record.balances.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_patch_balance() {
        let mut registry = AccountRegistry::new();
        registry.on_open("Assets:Cash", date(1, 1), &[]);
        assert!(registry.patch_balance("Assets:Cash", "-12.50"));
        assert!(registry.patch_balance("Assets:Cash", "3"));
        assert!(!registry.patch_balance("Assets:Other", "1"));

        assert_eq!(
            registry.get("Assets:Cash").unwrap().balances,
            vec!["-12.50", "3"]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let mut registry = AccountRegistry::new();
        registry.on_open("Assets:Cash", date(1, 1), &["USD".to_string()]);
        registry.patch_balance("Assets:Cash", "5.00");

        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(
            json,
            r#"{"Assets:Cash":{"open":"2024-01-01","close":"","currencies":["USD"],"balance":["5.00"]}}"#
        );
    }
}
