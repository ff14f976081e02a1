//! Parse error types.

use crate::Span;
use thiserror::Error;

/// A parse error with location information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The span where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Kinds of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Input the lexer could not make sense of.
    #[error("syntax error: unexpected '{0}'")]
    UnexpectedInput(String),
    /// A token other than the one required here.
    #[error("expected {expected}, found '{found}'")]
    Expected {
        /// What the grammar required
        expected: &'static str,
        /// What was actually there
        found: String,
    },
    /// Line ended before the directive was complete.
    #[error("expected {0}, found end of line")]
    UnexpectedEol(&'static str),
    /// Date that does not exist on the calendar.
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    /// Number that does not fit a decimal.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// Arithmetic that cannot be evaluated.
    #[error("invalid expression: {0}")]
    InvalidExpression(&'static str),
    /// Indented line where a directive was expected.
    #[error("unexpected indentation")]
    UnexpectedIndent,
    /// `poptag`/`popmeta` without a matching push.
    #[error("attempting to pop absent {0}")]
    UnbalancedPop(String),
    /// `pushtag`/`pushmeta` still open at end of file.
    #[error("unbalanced pushed {0}")]
    UnclosedPush(String),
    /// Date not followed by a directive keyword or flag.
    #[error("missing directive after date")]
    MissingDirective,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ParseError::new(
            ParseErrorKind::Expected {
                expected: "account",
                found: "USD".to_string(),
            },
            Span::new(0, 3),
        );
        assert_eq!(err.message(), "expected account, found 'USD'");
        assert_eq!(err.to_string(), err.message());

        let pop = ParseErrorKind::UnbalancedPop("tag 'trip'".to_string());
        assert_eq!(pop.to_string(), "attempting to pop absent tag 'trip'");
    }
}
