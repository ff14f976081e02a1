//! Inferred posting amounts, indexed by source location.

use beancheck_core::Posting;
use serde::Serialize;
use std::collections::BTreeMap;

/// `file -> line -> amounts`, amounts in the order they were seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AutomaticIndex {
    by_file: BTreeMap<String, BTreeMap<usize, Vec<String>>>,
}

impl AutomaticIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `posting` if its amount was inferred. Returns whether it was.
    pub fn record(&mut self, posting: &Posting) -> bool {
        if !posting.is_automatic() {
            return false;
        }
        let Some(units) = posting.amount() else {
            return false;
        };
        let (file, line) = posting
            .location()
            .map_or(("", 0), |loc| (loc.file, loc.line));
        self.by_file
            .entry(file.to_string())
            .or_default()
            .entry(line)
            .or_default()
            .push(units.to_string());
        true
    }

    /// Amounts inferred at `file:line`.
    #[must_use]
    pub fn get(&self, file: &str, line: usize) -> Option<&[String]> {
        self.by_file.get(file)?.get(&line).map(Vec::as_slice)
    }

    /// Whether nothing was inferred.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}
