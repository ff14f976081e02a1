//! Logos lexer for ledger syntax.
//!
//! Logos compiles the token patterns into a single DFA. Indentation is not
//! a Logos token; [`tokenize`] inserts [`Token::Indent`] in a post-pass so the
//! parser can tell postings and metadata apart from directives.

use logos::Logos;
use std::fmt;

use crate::Span;

/// Token types produced by the lexer.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    /// A date in YYYY-MM-DD or YYYY/MM/DD format.
    #[regex(r"\d{4}[-/]\d{1,2}[-/]\d{1,2}")]
    Date(&'src str),

    /// A number with optional sign, thousands separators, and decimals.
    #[regex(r"-?(\d{1,3}(,\d{3})*|\d+)(\.\d*)?")]
    Number(&'src str),

    /// A double-quoted string, quotes included. May span lines.
    #[regex(r#""([^"\\]|\\.)*""#)]
    String(&'src str),

    /// An account name like Assets:Bank:Checking.
    ///
    /// Components start with an uppercase letter or digit in any script.
    #[regex(r"(Assets|Liabilities|Equity|Income|Expenses)(:[\p{Lu}\p{Nd}][\p{L}\p{Nd}-]*)+")]
    Account(&'src str),

    /// A currency/commodity code like USD, AAPL, VACHR.
    ///
    /// At least two characters so that single-letter flags stay flags.
    #[regex(r"[A-Z][A-Z0-9'._-]*[A-Z0-9]")]
    Currency(&'src str),

    /// A tag like `#trip-2024`, `#` included.
    #[regex(r"#[a-zA-Z0-9_/.-]+")]
    Tag(&'src str),

    /// A link like `^invoice-12`, `^` included.
    #[regex(r"\^[a-zA-Z0-9_/.-]+")]
    Link(&'src str),

    /// `txn`
    #[token("txn")]
    Txn,
    /// `balance`
    #[token("balance")]
    Balance,
    /// `open`
    #[token("open")]
    Open,
    /// `close`
    #[token("close")]
    Close,
    /// `commodity`
    #[token("commodity")]
    Commodity,
    /// `pad`
    #[token("pad")]
    Pad,
    /// `event`
    #[token("event")]
    Event,
    /// `query`
    #[token("query")]
    Query,
    /// `note`
    #[token("note")]
    Note,
    /// `document`
    #[token("document")]
    Document,
    /// `price`
    #[token("price")]
    Price,
    /// `custom`
    #[token("custom")]
    Custom,
    /// `option`
    #[token("option")]
    Option_,
    /// `include`
    #[token("include")]
    Include,
    /// `plugin`
    #[token("plugin")]
    Plugin,
    /// `pushtag`
    #[token("pushtag")]
    Pushtag,
    /// `poptag`
    #[token("poptag")]
    Poptag,
    /// `pushmeta`
    #[token("pushmeta")]
    Pushmeta,
    /// `popmeta`
    #[token("popmeta")]
    Popmeta,
    /// `TRUE`
    #[token("TRUE")]
    True,
    /// `FALSE`
    #[token("FALSE")]
    False,
    /// `NULL`
    #[token("NULL")]
    Null,

    /// `{{` opening a total cost.
    #[token("{{")]
    LDoubleBrace,
    /// `}}`
    #[token("}}")]
    RDoubleBrace,
    /// `{` opening a per-unit cost.
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `@@` total price.
    #[token("@@")]
    AtAt,
    /// `@` unit price.
    #[token("@")]
    At,
    /// `,`
    #[token(",")]
    Comma,
    /// `~` balance tolerance.
    #[token("~")]
    Tilde,
    /// `#` separating per-unit and total cost inside braces.
    #[token("#")]
    Hash,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`, the completed flag and multiplication.
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,

    /// `!`, the needs-review flag.
    #[token("!")]
    Pending,

    /// Other single-character flags.
    #[regex(r"[PSTCURM?%&]")]
    Flag(&'src str),

    /// End of line.
    #[regex(r"\r?\n")]
    Newline,

    /// A comment, `;` included.
    #[regex(r";[^\n\r]*")]
    Comment(&'src str),

    /// A metadata key, trailing colon included.
    #[regex(r"[a-z][a-zA-Z0-9_-]*:")]
    MetaKey(&'src str),

    /// Leading whitespace of an indented line (inserted by [`tokenize`]).
    Indent,

    /// Unrecognized input.
    Error,
}

impl Token<'_> {
    /// Returns true if this token can open a transaction.
    pub const fn is_txn_flag(&self) -> bool {
        matches!(self, Self::Txn | Self::Star | Self::Pending | Self::Flag(_))
    }

    /// Returns true if this token can flag a posting.
    pub const fn is_posting_flag(&self) -> bool {
        matches!(self, Self::Star | Self::Pending | Self::Flag(_))
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Date(s)
            | Self::Number(s)
            | Self::String(s)
            | Self::Account(s)
            | Self::Currency(s)
            | Self::Tag(s)
            | Self::Link(s)
            | Self::Flag(s)
            | Self::Comment(s)
            | Self::MetaKey(s) => s,
            Self::Txn => "txn",
            Self::Balance => "balance",
            Self::Open => "open",
            Self::Close => "close",
            Self::Commodity => "commodity",
            Self::Pad => "pad",
            Self::Event => "event",
            Self::Query => "query",
            Self::Note => "note",
            Self::Document => "document",
            Self::Price => "price",
            Self::Custom => "custom",
            Self::Option_ => "option",
            Self::Include => "include",
            Self::Plugin => "plugin",
            Self::Pushtag => "pushtag",
            Self::Poptag => "poptag",
            Self::Pushmeta => "pushmeta",
            Self::Popmeta => "popmeta",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Null => "NULL",
            Self::LDoubleBrace => "{{",
            Self::RDoubleBrace => "}}",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::AtAt => "@@",
            Self::At => "@",
            Self::Comma => ",",
            Self::Tilde => "~",
            Self::Hash => "#",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Pending => "!",
            Self::Newline => "\\n",
            Self::Indent => "<indent>",
            Self::Error => "<error>",
        };
        f.write_str(text)
    }
}

/// Tokenize source code into `(Token, Span)` pairs.
///
/// An [`Token::Indent`] is emitted before the first token of any line that
/// starts with whitespace; its span covers the whitespace so the parser can
/// compare indentation depths.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Span)> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    let mut at_line_start = true;
    let mut line_start = 0usize;

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();

        if let Ok(Token::Newline) = result {
            tokens.push((Token::Newline, span));
            at_line_start = true;
            line_start = span.end;
            continue;
        }

        if at_line_start && span.start > line_start {
            tokens.push((Token::Indent, Span::new(line_start, span.start)));
        }
        at_line_start = false;
        tokens.push((result.unwrap_or(Token::Error), span));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(kinds("2024-01-15"), vec![Token::Date("2024-01-15")]);
        assert_eq!(kinds("-1,234.56"), vec![Token::Number("-1,234.56")]);
        assert_eq!(
            kinds("Assets:Bank:Checking"),
            vec![Token::Account("Assets:Bank:Checking")]
        );
        assert_eq!(kinds("USD"), vec![Token::Currency("USD")]);
        assert_eq!(kinds(r#""Hi, there""#), vec![Token::String(r#""Hi, there""#)]);
    }

    #[test]
    fn test_unicode_account_components() {
        assert_eq!(
            kinds("Expenses:Café:Ölkännchen"),
            vec![Token::Account("Expenses:Café:Ölkännchen")]
        );
        assert_eq!(
            kinds("Assets:Banque  10 EUR"),
            vec![
                Token::Account("Assets:Banque"),
                Token::Number("10"),
                Token::Currency("EUR"),
            ]
        );
    }

    #[test]
    fn test_single_letters_are_flags() {
        assert_eq!(kinds("P"), vec![Token::Flag("P")]);
        assert_eq!(kinds("!"), vec![Token::Pending]);
        assert_eq!(kinds("*"), vec![Token::Star]);
    }

    #[test]
    fn test_tag_link_and_meta_key() {
        assert_eq!(
            kinds("#my-tag ^my.link filename:"),
            vec![
                Token::Tag("#my-tag"),
                Token::Link("^my.link"),
                Token::MetaKey("filename:")
            ]
        );
    }

    #[test]
    fn test_indent_span_covers_whitespace() {
        let tokens = tokenize("txn\n    Assets:Bank 100 USD");
        let (token, span) = &tokens[2];
        assert_eq!(*token, Token::Indent);
        assert_eq!(span.end - span.start, 4);
        assert_eq!(tokens[3].0, Token::Account("Assets:Bank"));
    }

    #[test]
    fn test_unknown_input_is_error() {
        assert!(kinds("2024-01-01 bogus").contains(&Token::Error));
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{{ }} { } @@ @ , ~"),
            vec![
                Token::LDoubleBrace,
                Token::RDoubleBrace,
                Token::LBrace,
                Token::RBrace,
                Token::AtAt,
                Token::At,
                Token::Comma,
                Token::Tilde,
            ]
        );
    }
}
