//! Flag characters used on transactions and postings.
//!
//! [`ALL`] enumerates every flag known to the ledger format as
//! `(name, code)` pairs, in the order the format defines them.

/// Completed transaction.
pub const FLAG_OKAY: char = '*';
/// Needs review.
pub const FLAG_WARNING: char = '!';
/// Synthetic transaction inserted by a `pad` directive.
pub const FLAG_PADDING: char = 'P';
/// Summarization entry.
pub const FLAG_SUMMARIZE: char = 'S';
/// Transfer of balances between accounts.
pub const FLAG_TRANSFER: char = 'T';
/// Currency conversion entry.
pub const FLAG_CONVERSIONS: char = 'C';
/// Unrealized gains entry.
pub const FLAG_UNREALIZED: char = 'U';
/// Returns computation entry.
pub const FLAG_RETURNS: char = 'R';
/// Merged entry.
pub const FLAG_MERGING: char = 'M';

/// Every flag as `(name, code)`.
pub const ALL: [(&str, char); 9] = [
    ("OKAY", FLAG_OKAY),
    ("WARNING", FLAG_WARNING),
    ("PADDING", FLAG_PADDING),
    ("SUMMARIZE", FLAG_SUMMARIZE),
    ("TRANSFER", FLAG_TRANSFER),
    ("CONVERSIONS", FLAG_CONVERSIONS),
    ("UNREALIZED", FLAG_UNREALIZED),
    ("RETURNS", FLAG_RETURNS),
    ("MERGING", FLAG_MERGING),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<char> = ALL.iter().map(|(_, code)| *code).collect();
        assert_eq!(codes.len(), ALL.len());
    }
}
