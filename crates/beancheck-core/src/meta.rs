//! Reserved metadata keys written by the loader and booking passes.
//!
//! Every directive and posting carries `filename` and `lineno` entries once
//! loaded; postings whose amount was inferred also carry `__automatic__`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{MetaValue, Metadata};

/// Key holding the source file path.
pub const FILENAME: &str = "filename";
/// Key holding the 1-based source line.
pub const LINENO: &str = "lineno";
/// Key marking a posting whose amount was filled by interpolation.
pub const AUTOMATIC: &str = "__automatic__";

/// A position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation<'a> {
    /// Path of the file as given to the loader
    pub file: &'a str,
    /// 1-based line number
    pub line: usize,
}

impl<'a> SourceLocation<'a> {
    /// Read the location stored in `meta`.
    ///
    /// The line is required; a missing file name reads as `""`.
    #[must_use]
    pub fn from_meta(meta: &'a Metadata) -> Option<Self> {
        let line = match meta.get(LINENO) {
            Some(MetaValue::Number(n)) => n.to_usize()?,
            _ => return None,
        };
        let file = match meta.get(FILENAME) {
            Some(MetaValue::String(s)) => s.as_str(),
            _ => "",
        };
        Some(Self { file, line })
    }
}

/// Record the line number in `meta`.
pub fn set_lineno(meta: &mut Metadata, line: usize) {
    meta.insert(LINENO.to_string(), MetaValue::Number(Decimal::from(line)));
}

/// Record the file name in `meta`.
pub fn set_filename(meta: &mut Metadata, file: &str) {
    meta.insert(FILENAME.to_string(), MetaValue::String(file.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_location() {
        let mut meta = Metadata::new();
        set_filename(&mut meta, "main.beancount");
        set_lineno(&mut meta, 12);

        let loc = SourceLocation::from_meta(&meta).unwrap();
        assert_eq!(loc.file, "main.beancount");
        assert_eq!(loc.line, 12);
    }

    #[test]
    fn test_missing_line() {
        let mut meta = Metadata::new();
        set_filename(&mut meta, "main.beancount");
        assert!(SourceLocation::from_meta(&meta).is_none());
    }

    #[test]
    fn test_missing_file_defaults_to_empty() {
        let mut meta = Metadata::new();
        set_lineno(&mut meta, 3);
        assert_eq!(SourceLocation::from_meta(&meta).unwrap().file, "");
    }
}
