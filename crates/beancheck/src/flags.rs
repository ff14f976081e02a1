//! Flag code to flag name lookup.

use beancheck_core::flags;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::collections::HashMap;

static NAMES: OnceCell<HashMap<char, &'static str>> = OnceCell::new();

fn names() -> &'static HashMap<char, &'static str> {
    NAMES.get_or_init(|| flags::ALL.iter().map(|&(name, code)| (code, name)).collect())
}

/// Name of the flag `code`, e.g. `WARNING` for `!`.
///
/// Codes outside the known set resolve to themselves.
#[must_use]
pub fn resolve(code: char) -> Cow<'static, str> {
    names()
        .get(&code)
        .map_or_else(|| Cow::Owned(code.to_string()), |name| Cow::Borrowed(*name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_flags() {
        assert_eq!(resolve('!'), "WARNING");
        assert_eq!(resolve('*'), "OKAY");
        assert_eq!(resolve('P'), "PADDING");
        assert_eq!(resolve('M'), "MERGING");
    }

    #[test]
    fn test_unknown_flag_resolves_to_itself() {
        assert_eq!(resolve('#'), "#");
        assert_eq!(resolve('x'), "x");
    }
}
