//! Ledger parser.
//!
//! Produces a stream of [`Directive`]s from source text, along with the
//! `option`, `include` and `plugin` lines and any parse errors. Parsing never
//! stops at the first error: a broken directive is reported and skipped.
//!
//! Every parsed directive and posting carries a `lineno` metadata entry
//! holding its 1-based source line.
//!
//! # Example
//!
//! ```
//! use beancheck_parser::parse;
//!
//! let source = r#"
//! 2024-01-15 * "Coffee Shop" "Morning coffee"
//!   Expenses:Food:Coffee  5.00 USD
//!   Assets:Cash
//! "#;
//!
//! let result = parse(source);
//! assert!(result.errors.is_empty());
//! assert_eq!(result.directives.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod lexer;
mod parser;
mod span;

pub use error::{ParseError, ParseErrorKind};
pub use span::{Span, Spanned};

use beancheck_core::Directive;

/// Result of parsing a ledger file.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Successfully parsed directives, in file order.
    pub directives: Vec<Spanned<Directive>>,
    /// `option "key" "value"` lines.
    pub options: Vec<(String, String, Span)>,
    /// `include "path"` lines.
    pub includes: Vec<(String, Span)>,
    /// `plugin "module" ["config"]` lines.
    pub plugins: Vec<(String, Option<String>, Span)>,
    /// Parse errors encountered.
    pub errors: Vec<ParseError>,
}

/// Parse ledger source code.
pub fn parse(source: &str) -> ParseResult {
    parser::parse(source)
}
