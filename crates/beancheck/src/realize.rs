//! Per-account balances and the text balance report.

use beancheck_core::{Directive, DisplayContext, Inventory};
use std::collections::BTreeMap;

/// Realize every posting into a per-account inventory.
///
/// Every opened account is present, as is every parent of an account in
/// the tree. Positions held at cost count in the cost currency. Parents
/// only hold what was posted to them directly.
#[must_use]
pub fn realize(entries: &[Directive]) -> BTreeMap<String, Inventory> {
    let mut balances: BTreeMap<String, Inventory> = BTreeMap::new();

    for entry in entries {
        match entry {
            Directive::Open(open) => {
                balances.entry(open.account.clone()).or_default();
            }
            Directive::Transaction(txn) => {
                for posting in &txn.postings {
                    let Some(units) = posting.amount() else {
                        continue;
                    };
                    let held = posting
                        .cost
                        .as_ref()
                        .and_then(|cost| cost.total_for(units))
                        .unwrap_or_else(|| units.clone());
                    balances
                        .entry(posting.account.clone())
                        .or_default()
                        .add(&held);
                }
            }
            _ => {}
        }
    }

    let parents: Vec<String> = balances.keys().flat_map(|a| parent_accounts(a)).collect();
    for parent in parents {
        balances.entry(parent).or_default();
    }

    balances
}

fn parent_accounts(account: &str) -> impl Iterator<Item = String> + '_ {
    account
        .match_indices(':')
        .map(move |(idx, _)| account[..idx].to_string())
}

/// Render the balance report, one line per account.
///
/// ```text
/// Assets
/// Assets:Cash     -12.50 USD
/// Assets:Wallet     5.00 CHF
///                 100.00 EUR
/// ```
///
/// Accounts are ordered component by component, so `Assets:Cash` sorts
/// right after `Assets`. Extra currencies go on continuation lines with a
/// blank account column.
#[must_use]
pub fn render_balances(entries: &[Directive], dcontext: &DisplayContext) -> Vec<String> {
    let balances = realize(entries);

    let mut accounts: Vec<(&String, Vec<(String, &str)>)> = balances
        .iter()
        .map(|(account, inventory)| {
            let mut positions: Vec<_> = inventory.positions().iter().collect();
            positions.sort_by(|a, b| a.currency.cmp(&b.currency));
            let cells = positions
                .into_iter()
                .map(|pos| (dcontext.format(pos.number, &pos.currency), pos.currency.as_str()))
                .collect();
            (account, cells)
        })
        .collect();
    accounts.sort_by(|(a, _), (b, _)| a.split(':').cmp(b.split(':')));

    let name_width = accounts.iter().map(|(a, _)| a.chars().count()).max().unwrap_or(0);
    let number_width = accounts
        .iter()
        .flat_map(|(_, cells)| cells.iter().map(|(n, _)| n.len()))
        .max()
        .unwrap_or(0)
        + 2;

    let mut lines = Vec::with_capacity(accounts.len());
    for (account, cells) in accounts {
        if cells.is_empty() {
            lines.push(account.clone());
            continue;
        }
        for (i, (number, currency)) in cells.iter().enumerate() {
            let name = if i == 0 { account.as_str() } else { "" };
            lines.push(format!(
                "{name:<name_width$} {number:>number_width$} {currency}"
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use beancheck_core::{Amount, CostSpec, NaiveDate, Open, Posting, Transaction};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn entries() -> Vec<Directive> {
        vec![
            Directive::Open(Open::new(date(), "Assets:Cash")),
            Directive::Open(Open::new(date(), "Expenses:Food")),
            Directive::Transaction(
                Transaction::new(date(), "Lunch")
                    .with_posting(Posting::new("Expenses:Food", Amount::new(dec!(12.50), "USD")))
                    .with_posting(Posting::new("Assets:Cash", Amount::new(dec!(-12.50), "USD"))),
            ),
        ]
    }

    #[test]
    fn test_realize_adds_parents() {
        let balances = realize(&entries());
        let names: Vec<_> = balances.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Assets", "Assets:Cash", "Expenses", "Expenses:Food"]
        );
        assert!(balances["Assets"].is_empty());
        assert_eq!(balances["Assets:Cash"].units("USD"), dec!(-12.50));
    }

    #[test]
    fn test_realize_converts_cost() {
        let entries = vec![Directive::Transaction(
            Transaction::new(date(), "Buy").with_posting(
                Posting::new("Assets:Broker", Amount::new(dec!(10), "AAPL")).with_cost(
                    CostSpec::empty()
                        .with_number_per(dec!(150))
                        .with_currency("USD"),
                ),
            ),
        )];
        let balances = realize(&entries);
        assert_eq!(balances["Assets:Broker"].units("USD"), dec!(1500));
        assert_eq!(balances["Assets:Broker"].units("AAPL"), dec!(0));
    }

    #[test]
    fn test_render_balances() {
        let mut dcontext = DisplayContext::new();
        dcontext.update(dec!(12.50), "USD");

        let lines = render_balances(&entries(), &dcontext);
        assert_eq!(
            lines,
            vec![
                "Assets",
                "Assets:Cash     -12.50 USD",
                "Expenses",
                "Expenses:Food    12.50 USD",
            ]
        );
    }

    #[test]
    fn test_render_continuation_lines() {
        let entries = vec![Directive::Transaction(
            Transaction::new(date(), "Swap")
                .with_posting(Posting::new("Assets:Wallet", Amount::new(dec!(100), "EUR")))
                .with_posting(Posting::new("Assets:Wallet", Amount::new(dec!(5), "CHF"))),
        )];

        let lines = render_balances(&entries, &DisplayContext::new());
        assert_eq!(
            lines,
            vec!["Assets", "Assets:Wallet     5 CHF", "                100 EUR"]
        );
    }

    #[test]
    fn test_component_order() {
        let entries = vec![
            Directive::Open(Open::new(date(), "Assets-Old")),
            Directive::Open(Open::new(date(), "Assets:Cash")),
        ];
        let lines = render_balances(&entries, &DisplayContext::new());
        assert_eq!(lines, vec!["Assets", "Assets:Cash", "Assets-Old"]);
    }
}
