//! Reading balances back out of the text balance report.

use super::AccountRegistry;
use tracing::debug;

/// Split a report line into its account and balance token.
///
/// The account is everything before the first space; the token is the
/// first word after it. Continuation lines yield an empty account, which
/// matches no record.
#[must_use]
pub fn parse_balance_line(line: &str) -> Option<(&str, &str)> {
    let (account, rest) = line.split_once(' ')?;
    let token = rest.split_whitespace().next()?;
    Some((account, token))
}

/// Append the balance of every reported account to its record.
///
/// Returns how many tokens were attached.
pub fn apply_balance_report<I, S>(registry: &mut AccountRegistry, lines: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut patched = 0;
    for line in lines {
        let Some((account, token)) = parse_balance_line(line.as_ref()) else {
            continue;
        };
        if registry.patch_balance(account, token) {
            patched += 1;
        }
    }
    debug!(patched, "balance report applied");
    patched
}
