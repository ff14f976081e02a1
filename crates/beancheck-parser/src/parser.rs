//! Recursive descent parser over the token stream.
//!
//! The grammar is line oriented: every directive starts on an unindented
//! line, and postings and metadata follow on indented lines. When a
//! directive fails to parse, the error is recorded and parsing resumes at
//! the next unindented line.

use std::str::FromStr;

use beancheck_core::meta;
use beancheck_core::{
    Amount, Balance, Close, Commodity, CostSpec, Custom, Decimal, Directive, Document, Event,
    IncompleteAmount, MetaValue, Metadata, NaiveDate, Note, Open, Pad, Posting, Price,
    PriceAnnotation, Query, Transaction,
};

use crate::lexer::{tokenize, Token};
use crate::{ParseError, ParseErrorKind, ParseResult, Span, Spanned};

type PResult<T> = Result<T, ParseError>;

pub fn parse(source: &str) -> ParseResult {
    Parser::new(source).run()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Span)>,
    pos: usize,
    last_end: usize,
    line_starts: Vec<usize>,
    tag_stack: Vec<(String, Span)>,
    meta_stack: Vec<(String, MetaValue, Span)>,
    result: ParseResult,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            last_end: 0,
            line_starts,
            tag_stack: Vec::new(),
            meta_stack: Vec::new(),
            result: ParseResult::default(),
        }
    }

    fn run(mut self) -> ParseResult {
        while let Some((token, span)) = self.peek_full() {
            let outcome = match token {
                Token::Newline | Token::Comment(_) => {
                    self.pos += 1;
                    Ok(())
                }
                Token::Indent => self.parse_blank_indented_line(),
                Token::Date(_) => self.parse_dated(),
                Token::Option_ => self.parse_option(),
                Token::Include => self.parse_include(),
                Token::Plugin => self.parse_plugin(),
                Token::Pushtag | Token::Poptag => self.parse_tag_stack(),
                Token::Pushmeta | Token::Popmeta => self.parse_meta_stack(),
                // Org-mode section headings.
                Token::Star | Token::Flag(_) => {
                    self.skip_line();
                    Ok(())
                }
                Token::Error => Err(ParseError::new(
                    ParseErrorKind::UnexpectedInput(span.text(self.source).to_string()),
                    span,
                )),
                _ => Err(self.unexpected("directive")),
            };
            if let Err(err) = outcome {
                self.result.errors.push(err);
                self.recover();
            }
        }

        for (tag, span) in std::mem::take(&mut self.tag_stack) {
            self.result.errors.push(ParseError::new(
                ParseErrorKind::UnclosedPush(format!("tag '{tag}'")),
                span,
            ));
        }
        for (key, _, span) in std::mem::take(&mut self.meta_stack) {
            self.result.errors.push(ParseError::new(
                ParseErrorKind::UnclosedPush(format!("metadata '{key}'")),
                span,
            ));
        }
        self.result
    }

    // ===== token cursor =====

    fn peek_full(&self) -> Option<(Token<'src>, Span)> {
        self.tokens.get(self.pos).cloned()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn bump(&mut self) -> Option<(Token<'src>, Span)> {
        let item = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        self.last_end = item.1.end;
        Some(item)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or(Span::new(self.last_end, self.last_end), |(_, s)| *s)
    }

    fn at_eol(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Newline | Token::Comment(_))
        )
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// Error for the token under the cursor when `expected` was required.
    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek_full() {
            None | Some((Token::Newline | Token::Comment(_), _)) => ParseError::new(
                ParseErrorKind::UnexpectedEol(expected),
                self.current_span(),
            ),
            Some((_, span)) => ParseError::new(
                ParseErrorKind::Expected {
                    expected,
                    found: span.text(self.source).to_string(),
                },
                span,
            ),
        }
    }

    fn expect_eol(&mut self) -> PResult<()> {
        if let Some(Token::Comment(_)) = self.peek() {
            self.bump();
        }
        match self.peek() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.unexpected("end of line")),
        }
    }

    fn skip_line(&mut self) {
        while let Some((token, _)) = self.bump() {
            if token == Token::Newline {
                break;
            }
        }
    }

    /// Skip the rest of a broken directive, including its indented lines.
    fn recover(&mut self) {
        self.skip_line();
        while let Some(Token::Indent) = self.peek() {
            self.skip_line();
        }
    }

    fn parse_blank_indented_line(&mut self) -> PResult<()> {
        let (_, span) = self.bump().unwrap_or((Token::Indent, self.current_span()));
        if self.at_eol() {
            self.expect_eol()
        } else {
            Err(ParseError::new(ParseErrorKind::UnexpectedIndent, span))
        }
    }

    // ===== primitives =====

    fn expect_account(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::Account(a)) => {
                let account = (*a).to_string();
                self.bump();
                Ok(account)
            }
            _ => Err(self.unexpected("account")),
        }
    }

    fn expect_currency(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::Currency(c)) => {
                let currency = (*c).to_string();
                self.bump();
                Ok(currency)
            }
            _ => Err(self.unexpected("currency")),
        }
    }

    fn expect_string(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::String(s)) => {
                let value = unescape(s);
                self.bump();
                Ok(value)
            }
            _ => Err(self.unexpected("string")),
        }
    }

    fn expect_date(&mut self) -> PResult<NaiveDate> {
        match self.peek_full() {
            Some((Token::Date(d), span)) => {
                self.bump();
                parse_date(d, span)
            }
            _ => Err(self.unexpected("date")),
        }
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Number(_) | Token::LParen | Token::Minus | Token::Plus)
        )
    }

    /// `expr := term (('+' | '-') term)*`
    fn parse_expr(&mut self) -> PResult<Decimal> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.bump();
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// `term := factor (('*' | '/') factor)*`
    fn parse_term(&mut self) -> PResult<Decimal> {
        let mut value = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    value *= self.parse_factor()?;
                }
                Some(Token::Slash) => {
                    let span = self.current_span();
                    self.bump();
                    let divisor = self.parse_factor()?;
                    value = value.checked_div(divisor).ok_or_else(|| {
                        ParseError::new(
                            ParseErrorKind::InvalidExpression("division by zero"),
                            span,
                        )
                    })?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_factor(&mut self) -> PResult<Decimal> {
        match self.peek_full() {
            Some((Token::Number(n), span)) => {
                self.bump();
                parse_number(n, span)
            }
            Some((Token::LParen, _)) => {
                self.bump();
                let value = self.parse_expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.bump();
                        Ok(value)
                    }
                    _ => Err(self.unexpected("')'")),
                }
            }
            Some((Token::Minus, _)) => {
                self.bump();
                Ok(-self.parse_factor()?)
            }
            Some((Token::Plus, _)) => {
                self.bump();
                self.parse_factor()
            }
            _ => Err(self.unexpected("number")),
        }
    }

    fn parse_amount(&mut self) -> PResult<Amount> {
        let number = self.parse_expr()?;
        let currency = self.expect_currency()?;
        Ok(Amount::new(number, currency))
    }

    fn parse_meta_value(&mut self) -> PResult<MetaValue> {
        if self.at_eol() {
            return Ok(MetaValue::None);
        }
        if self.starts_expression() {
            let number = self.parse_expr()?;
            return Ok(match self.peek() {
                Some(Token::Currency(c)) => {
                    let amount = Amount::new(number, *c);
                    self.bump();
                    MetaValue::Amount(amount)
                }
                _ => MetaValue::Number(number),
            });
        }
        let Some((token, span)) = self.peek_full() else {
            return Ok(MetaValue::None);
        };
        let value = match token {
            Token::String(s) => MetaValue::String(unescape(s)),
            Token::Account(a) => MetaValue::Account(a.to_string()),
            Token::Currency(c) => MetaValue::Currency(c.to_string()),
            Token::Tag(t) => MetaValue::Tag(t[1..].to_string()),
            Token::Link(l) => MetaValue::Link(l[1..].to_string()),
            Token::Date(d) => MetaValue::Date(parse_date(d, span)?),
            Token::True => MetaValue::Bool(true),
            Token::False => MetaValue::Bool(false),
            Token::Null => MetaValue::None,
            _ => return Err(self.unexpected("metadata value")),
        };
        self.bump();
        Ok(value)
    }

    /// `key: value` after the indent has been consumed.
    fn parse_key_value(&mut self) -> PResult<(String, MetaValue)> {
        let key = match self.peek() {
            Some(Token::MetaKey(k)) => k.trim_end_matches(':').to_string(),
            _ => return Err(self.unexpected("metadata key")),
        };
        self.bump();
        let value = self.parse_meta_value()?;
        self.expect_eol()?;
        Ok((key, value))
    }

    /// Indented `key: value` lines following a non-transaction directive.
    fn parse_metadata_lines(&mut self, meta: &mut Metadata) -> PResult<()> {
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some(Token::Indent), Some(Token::MetaKey(_))) => {
                    self.bump();
                    let (key, value) = self.parse_key_value()?;
                    meta.insert(key, value);
                }
                (Some(Token::Indent), None | Some(Token::Newline | Token::Comment(_))) => {
                    self.bump();
                    self.expect_eol()?;
                }
                _ => return Ok(()),
            }
        }
    }

    // ===== directives =====

    fn parse_dated(&mut self) -> PResult<()> {
        let start = self.current_span();
        let date = self.expect_date()?;
        let Some((keyword, keyword_span)) = self.peek_full() else {
            return Err(ParseError::new(ParseErrorKind::MissingDirective, start));
        };

        if keyword.is_txn_flag() {
            self.bump();
            let flag = match keyword {
                Token::Pending => '!',
                Token::Flag(f) => f.chars().next().unwrap_or('*'),
                _ => '*',
            };
            let txn = self.parse_transaction(date, flag)?;
            self.finish(Directive::Transaction(txn), start);
            return Ok(());
        }
        if matches!(keyword, Token::String(_)) {
            // Flagless transaction: `2024-01-01 "Payee" "Narration"`.
            let txn = self.parse_transaction(date, '*')?;
            self.finish(Directive::Transaction(txn), start);
            return Ok(());
        }

        let mut meta = Metadata::new();
        let directive = match keyword {
            Token::Open => {
                self.bump();
                let mut open = Open::new(date, self.expect_account()?);
                if let Some(Token::Currency(_)) = self.peek() {
                    open.currencies.push(self.expect_currency()?);
                    while let Some(Token::Comma) = self.peek() {
                        self.bump();
                        open.currencies.push(self.expect_currency()?);
                    }
                }
                if let Some(Token::String(_)) = self.peek() {
                    open.booking = Some(self.expect_string()?);
                }
                Directive::Open(open)
            }
            Token::Close => {
                self.bump();
                Directive::Close(Close::new(date, self.expect_account()?))
            }
            Token::Balance => {
                self.bump();
                let account = self.expect_account()?;
                let number = self.parse_expr()?;
                let tolerance = match self.peek() {
                    Some(Token::Tilde) => {
                        self.bump();
                        Some(self.parse_expr()?)
                    }
                    _ => None,
                };
                let currency = self.expect_currency()?;
                let mut balance = Balance::new(date, account, Amount::new(number, currency));
                balance.tolerance = tolerance;
                Directive::Balance(balance)
            }
            Token::Pad => {
                self.bump();
                let account = self.expect_account()?;
                let source = self.expect_account()?;
                Directive::Pad(Pad::new(date, account, source))
            }
            Token::Commodity => {
                self.bump();
                Directive::Commodity(Commodity {
                    date,
                    currency: self.expect_currency()?,
                    meta: Metadata::new(),
                })
            }
            Token::Price => {
                self.bump();
                let currency = self.expect_currency()?;
                let amount = self.parse_amount()?;
                Directive::Price(Price {
                    date,
                    currency,
                    amount,
                    meta: Metadata::new(),
                })
            }
            Token::Note => {
                self.bump();
                let account = self.expect_account()?;
                let comment = self.expect_string()?;
                Directive::Note(Note {
                    date,
                    account,
                    comment,
                    meta: Metadata::new(),
                })
            }
            Token::Document => {
                self.bump();
                let account = self.expect_account()?;
                let path = self.expect_string()?;
                Directive::Document(Document {
                    date,
                    account,
                    path,
                    meta: Metadata::new(),
                })
            }
            Token::Event => {
                self.bump();
                let event_type = self.expect_string()?;
                let value = self.expect_string()?;
                Directive::Event(Event {
                    date,
                    event_type,
                    value,
                    meta: Metadata::new(),
                })
            }
            Token::Query => {
                self.bump();
                let name = self.expect_string()?;
                let query = self.expect_string()?;
                Directive::Query(Query {
                    date,
                    name,
                    query,
                    meta: Metadata::new(),
                })
            }
            Token::Custom => {
                self.bump();
                let custom_type = self.expect_string()?;
                let mut values = Vec::new();
                while !self.at_eol() {
                    values.push(self.parse_meta_value()?);
                }
                Directive::Custom(Custom {
                    date,
                    custom_type,
                    values,
                    meta: Metadata::new(),
                })
            }
            Token::Newline | Token::Comment(_) => {
                return Err(ParseError::new(ParseErrorKind::MissingDirective, start));
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingDirective,
                    keyword_span,
                ))
            }
        };
        self.expect_eol()?;
        self.parse_metadata_lines(&mut meta)?;

        let mut directive = directive;
        directive.meta_mut().extend(meta);
        self.finish(directive, start);
        Ok(())
    }

    /// Stamp the line number and pushed metadata, then record the directive.
    fn finish(&mut self, mut directive: Directive, start: Span) {
        let line = self.line_of(start.start);
        let target = directive.meta_mut();
        for (key, value, _) in &self.meta_stack {
            target.entry(key.clone()).or_insert_with(|| value.clone());
        }
        meta::set_lineno(target, line);

        let span = Span::new(start.start, self.last_end.max(start.end));
        self.result.directives.push(Spanned::new(directive, span));
    }

    fn parse_transaction(&mut self, date: NaiveDate, flag: char) -> PResult<Transaction> {
        let mut strings = Vec::new();
        while let Some(Token::String(s)) = self.peek() {
            if strings.len() == 2 {
                return Err(self.unexpected("tag or link"));
            }
            strings.push(unescape(s));
            self.bump();
        }
        let mut strings = strings.into_iter();
        let (payee, narration) = match (strings.next(), strings.next()) {
            (Some(payee), Some(narration)) => (Some(payee), narration),
            (Some(narration), None) => (None, narration),
            _ => (None, String::new()),
        };

        let mut txn = Transaction::new(date, narration).with_flag(flag);
        txn.payee = payee;
        self.parse_tags_links(&mut txn)?;
        self.expect_eol()?;

        let mut posting_indent = usize::MAX;
        loop {
            let indent = match self.peek_full() {
                Some((Token::Indent, span)) => span.end - span.start,
                _ => break,
            };
            match self.peek_nth(1) {
                None | Some(Token::Newline | Token::Comment(_)) => {
                    self.bump();
                    self.expect_eol()?;
                }
                Some(Token::MetaKey(_)) => {
                    self.bump();
                    let (key, value) = self.parse_key_value()?;
                    match txn.postings.last_mut() {
                        Some(posting) if indent > posting_indent => {
                            posting.meta.insert(key, value);
                        }
                        _ => {
                            txn.meta.insert(key, value);
                        }
                    }
                }
                Some(Token::Tag(_) | Token::Link(_)) => {
                    self.bump();
                    self.parse_tags_links(&mut txn)?;
                    self.expect_eol()?;
                }
                Some(token) if token.is_posting_flag() || matches!(token, Token::Account(_)) => {
                    self.bump();
                    posting_indent = indent;
                    txn.postings.push(self.parse_posting()?);
                }
                Some(_) => {
                    self.bump();
                    return Err(self.unexpected("posting or metadata"));
                }
            }
        }

        for (tag, _) in &self.tag_stack {
            if !txn.tags.contains(tag) {
                txn.tags.push(tag.clone());
            }
        }
        Ok(txn)
    }

    fn parse_tags_links(&mut self, txn: &mut Transaction) -> PResult<()> {
        loop {
            match self.peek() {
                Some(Token::Tag(t)) => {
                    let tag = t[1..].to_string();
                    if !txn.tags.contains(&tag) {
                        txn.tags.push(tag);
                    }
                }
                Some(Token::Link(l)) => {
                    let link = l[1..].to_string();
                    if !txn.links.contains(&link) {
                        txn.links.push(link);
                    }
                }
                _ => return Ok(()),
            }
            self.bump();
        }
    }

    /// A posting line, after its indent.
    fn parse_posting(&mut self) -> PResult<Posting> {
        let start = self.current_span();
        let flag = match self.peek() {
            Some(Token::Pending) => Some('!'),
            Some(Token::Star) => Some('*'),
            Some(Token::Flag(f)) => f.chars().next(),
            _ => None,
        };
        if flag.is_some() {
            self.bump();
        }

        let mut posting = Posting::auto(self.expect_account()?);
        posting.flag = flag;

        if self.starts_expression() {
            let number = self.parse_expr()?;
            posting.units = Some(match self.peek() {
                Some(Token::Currency(_)) => {
                    IncompleteAmount::Complete(Amount::new(number, self.expect_currency()?))
                }
                _ => IncompleteAmount::NumberOnly(number),
            });
        } else if let Some(Token::Currency(_)) = self.peek() {
            posting.units = Some(IncompleteAmount::CurrencyOnly(self.expect_currency()?));
        }

        if matches!(self.peek(), Some(Token::LBrace | Token::LDoubleBrace)) {
            posting.cost = Some(self.parse_cost()?);
        }

        match self.peek() {
            Some(Token::At) => {
                self.bump();
                posting.price = Some(PriceAnnotation::Unit(self.parse_amount()?));
            }
            Some(Token::AtAt) => {
                self.bump();
                posting.price = Some(PriceAnnotation::Total(self.parse_amount()?));
            }
            _ => {}
        }

        self.expect_eol()?;
        meta::set_lineno(&mut posting.meta, self.line_of(start.start));
        Ok(posting)
    }

    fn parse_cost(&mut self) -> PResult<CostSpec> {
        let total = matches!(self.bump(), Some((Token::LDoubleBrace, _)));
        let mut spec = CostSpec::empty();
        loop {
            match self.peek() {
                Some(Token::RBrace) if !total => break,
                Some(Token::RDoubleBrace) if total => break,
                Some(Token::Comma | Token::Star) => {
                    self.bump();
                }
                Some(Token::Hash) => {
                    self.bump();
                    spec.number_total = Some(self.parse_expr()?);
                }
                Some(Token::Currency(_)) => spec.currency = Some(self.expect_currency()?),
                Some(Token::Date(_)) => spec.date = Some(self.expect_date()?),
                Some(Token::String(_)) => spec.label = Some(self.expect_string()?),
                _ if self.starts_expression() => {
                    let number = self.parse_expr()?;
                    if total {
                        spec.number_total = Some(number);
                    } else {
                        spec.number_per = Some(number);
                    }
                }
                _ => return Err(self.unexpected("cost component")),
            }
        }
        self.bump();
        Ok(spec)
    }

    // ===== undated directives =====

    fn parse_option(&mut self) -> PResult<()> {
        let (_, start) = self.bump().unwrap_or((Token::Option_, self.current_span()));
        let key = self.expect_string()?;
        let value = self.expect_string()?;
        let span = start.merge(&Span::new(self.last_end, self.last_end));
        self.expect_eol()?;
        self.result.options.push((key, value, span));
        Ok(())
    }

    fn parse_include(&mut self) -> PResult<()> {
        let (_, start) = self.bump().unwrap_or((Token::Include, self.current_span()));
        let path = self.expect_string()?;
        let span = start.merge(&Span::new(self.last_end, self.last_end));
        self.expect_eol()?;
        self.result.includes.push((path, span));
        Ok(())
    }

    fn parse_plugin(&mut self) -> PResult<()> {
        let (_, start) = self.bump().unwrap_or((Token::Plugin, self.current_span()));
        let name = self.expect_string()?;
        let config = match self.peek() {
            Some(Token::String(_)) => Some(self.expect_string()?),
            _ => None,
        };
        let span = start.merge(&Span::new(self.last_end, self.last_end));
        self.expect_eol()?;
        self.result.plugins.push((name, config, span));
        Ok(())
    }

    fn parse_tag_stack(&mut self) -> PResult<()> {
        let Some((keyword, _)) = self.bump() else {
            return Ok(());
        };
        let (tag, span) = match self.peek_full() {
            Some((Token::Tag(t), span)) => (t[1..].to_string(), span),
            _ => return Err(self.unexpected("tag")),
        };
        self.bump();

        if keyword == Token::Pushtag {
            self.tag_stack.push((tag, span));
        } else {
            let Some(idx) = self.tag_stack.iter().rposition(|(t, _)| *t == tag) else {
                return Err(ParseError::new(
                    ParseErrorKind::UnbalancedPop(format!("tag '{tag}'")),
                    span,
                ));
            };
            self.tag_stack.remove(idx);
        }
        self.expect_eol()
    }

    fn parse_meta_stack(&mut self) -> PResult<()> {
        let Some((keyword, _)) = self.bump() else {
            return Ok(());
        };
        let (key, span) = match self.peek_full() {
            Some((Token::MetaKey(k), span)) => (k.trim_end_matches(':').to_string(), span),
            _ => return Err(self.unexpected("metadata key")),
        };
        self.bump();

        if keyword == Token::Pushmeta {
            let value = self.parse_meta_value()?;
            self.expect_eol()?;
            self.meta_stack.push((key, value, span));
            return Ok(());
        }

        let Some(idx) = self.meta_stack.iter().rposition(|(k, _, _)| *k == key) else {
            return Err(ParseError::new(
                ParseErrorKind::UnbalancedPop(format!("metadata '{key}'")),
                span,
            ));
        };
        self.meta_stack.remove(idx);
        self.expect_eol()
    }
}

/// Parse a number token, dropping thousands separators.
fn parse_number(text: &str, span: Span) -> PResult<Decimal> {
    let cleaned = text.replace(',', "");
    Decimal::from_str(&cleaned)
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber(text.to_string()), span))
}

/// Parse a `YYYY-MM-DD` or `YYYY/MM/DD` date.
fn parse_date(text: &str, span: Span) -> PResult<NaiveDate> {
    NaiveDate::parse_from_str(&text.replace('/', "-"), "%Y-%m-%d")
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidDate(text.to_string()), span))
}

/// Strip the quotes of a string token and resolve escapes.
fn unescape(token: &str) -> String {
    let inner = token
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(token);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use beancheck_core::SourceLocation;
    use rust_decimal_macros::dec;

    fn only_directive(source: &str) -> Directive {
        let result = parse(source);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.directives.len(), 1);
        result.directives.into_iter().next().unwrap().into_inner()
    }

    #[test]
    fn test_parse_open_with_currencies() {
        let directive = only_directive("2024-01-01 open Assets:Bank USD,EUR \"FIFO\"\n");
        let Directive::Open(open) = directive else {
            panic!("expected open");
        };
        assert_eq!(open.account, "Assets:Bank");
        assert_eq!(open.currencies, vec!["USD", "EUR"]);
        assert_eq!(open.booking.as_deref(), Some("FIFO"));
    }

    #[test]
    fn test_parse_transaction_with_payee_tags_links() {
        let source = "2024-01-15 ! \"Cafe\" \"Coffee\" #trip ^receipt-1\n  Expenses:Food  4.50 USD\n  Assets:Cash\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(txn.flag, '!');
        assert_eq!(txn.payee.as_deref(), Some("Cafe"));
        assert_eq!(txn.narration, "Coffee");
        assert_eq!(txn.tags, vec!["trip"]);
        assert_eq!(txn.links, vec!["receipt-1"]);
        assert_eq!(txn.postings.len(), 2);
        assert_eq!(txn.postings[0].amount(), Some(&Amount::new(dec!(4.50), "USD")));
        assert!(txn.postings[1].units.is_none());
    }

    #[test]
    fn test_line_numbers_are_stamped() {
        let source = "\n2024-01-15 * \"Coffee\"\n  Expenses:Food  4.50 USD\n  Assets:Cash\n";
        let directive = only_directive(source);
        assert_eq!(directive.location().unwrap().line, 2);
        let txn = directive.as_transaction().unwrap();
        let lines: Vec<usize> = txn
            .postings
            .iter()
            .filter_map(|p| SourceLocation::from_meta(&p.meta).map(|l| l.line))
            .collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn test_posting_flag_and_metadata() {
        let source = "2024-01-15 * \"Coffee\"\n  note: \"txn level\"\n  ! Expenses:Food  4.50 USD\n    receipt: TRUE\n  Assets:Cash\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(
            txn.meta.get("note"),
            Some(&MetaValue::String("txn level".to_string()))
        );
        assert_eq!(txn.postings[0].flag, Some('!'));
        assert_eq!(txn.postings[0].meta.get("receipt"), Some(&MetaValue::Bool(true)));
        assert!(!txn.postings[1].meta.contains_key("receipt"));
    }

    #[test]
    fn test_number_keeps_scale_and_strips_commas() {
        let source = "2024-01-15 *\n  Assets:Cash  -1,100.438 USD\n  Equity:Opening\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(
            txn.postings[0].amount().unwrap().to_string(),
            "-1100.438 USD"
        );
        assert_eq!(txn.narration, "");
    }

    #[test]
    fn test_arithmetic_expression() {
        let source = "2024-01-15 *\n  Assets:Cash  (10 + 2) * 3 / 4 USD\n  Equity:Opening\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(txn.postings[0].amount().unwrap().number, dec!(9));
    }

    #[test]
    fn test_cost_and_price() {
        let source = "2024-01-15 *\n  Assets:Stock  10 AAPL {150.00 USD, 2024-01-01, \"lot\"} @ 155 USD\n  Assets:Cash\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        let cost = txn.postings[0].cost.as_ref().unwrap();
        assert_eq!(cost.number_per, Some(dec!(150.00)));
        assert_eq!(cost.currency.as_deref(), Some("USD"));
        assert_eq!(cost.label.as_deref(), Some("lot"));
        assert_eq!(
            txn.postings[0].price,
            Some(PriceAnnotation::Unit(Amount::new(dec!(155), "USD")))
        );
    }

    #[test]
    fn test_total_cost() {
        let source = "2024-01-15 *\n  Assets:Stock  10 AAPL {{1500 USD}}\n  Assets:Cash\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(txn.postings[0].cost.as_ref().unwrap().number_total, Some(dec!(1500)));
    }

    #[test]
    fn test_balance_with_tolerance() {
        let Directive::Balance(balance) =
            only_directive("2024-01-01 balance Assets:Cash 100.00 ~ 0.01 USD\n")
        else {
            panic!("expected balance");
        };
        assert_eq!(balance.amount, Amount::new(dec!(100.00), "USD"));
        assert_eq!(balance.tolerance, Some(dec!(0.01)));
    }

    #[test]
    fn test_other_directives() {
        let source = "\
2024-01-01 commodity USD
2024-01-01 pad Assets:Cash Equity:Opening
2024-01-01 price AAPL 150 USD
2024-01-01 note Assets:Cash \"hello\"
2024-01-01 document Assets:Cash \"/tmp/x.pdf\"
2024-01-01 event \"location\" \"Paris\"
2024-01-01 query \"q\" \"SELECT 1\"
2024-01-01 custom \"budget\" Expenses:Food 100 USD TRUE
";
        let result = parse(source);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        let names: Vec<_> = result
            .directives
            .iter()
            .map(|d| d.value.type_name())
            .collect();
        assert_eq!(
            names,
            vec!["commodity", "pad", "price", "note", "document", "event", "query", "custom"]
        );
        let Directive::Custom(custom) = &result.directives[7].value else {
            panic!("expected custom");
        };
        assert_eq!(custom.values.len(), 3);
    }

    #[test]
    fn test_options_includes_plugins() {
        let source = "option \"title\" \"Books\"\ninclude \"other.beancount\"\nplugin \"auto\" \"cfg\"\n";
        let result = parse(source);
        assert!(result.errors.is_empty());
        assert_eq!(result.options[0].0, "title");
        assert_eq!(result.options[0].1, "Books");
        assert_eq!(result.includes[0].0, "other.beancount");
        assert_eq!(result.plugins[0].1.as_deref(), Some("cfg"));
    }

    #[test]
    fn test_pushtag_and_pushmeta() {
        let source = "\
pushtag #trip
pushmeta location: \"Paris\"
2024-01-15 * \"Dinner\"
  Expenses:Food  20 EUR
  Assets:Cash
popmeta location:
poptag #trip
2024-01-16 * \"Home\"
  Expenses:Food  5 EUR
  Assets:Cash
";
        let result = parse(source);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        let first = result.directives[0].value.as_transaction().unwrap();
        let second = result.directives[1].value.as_transaction().unwrap();
        assert_eq!(first.tags, vec!["trip"]);
        assert_eq!(
            first.meta.get("location"),
            Some(&MetaValue::String("Paris".to_string()))
        );
        assert!(second.tags.is_empty());
        assert!(!second.meta.contains_key("location"));
    }

    #[test]
    fn test_unbalanced_pop_and_push() {
        let result = parse("poptag #nope\npushtag #open\n");
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].message().contains("pop absent tag 'nope'"));
        assert!(result.errors[1].message().contains("tag 'open'"));
    }

    #[test]
    fn test_error_recovery_skips_to_next_directive() {
        let source = "\
2024-01-01 open Assets:Cash
invalid beancount syntax here
2024-01-02 * \"Broken\"
  Assets:Cash  abc
  Equity:Opening
2024-01-03 close Assets:Cash
";
        let result = parse(source);
        assert_eq!(result.errors.len(), 2);
        let names: Vec<_> = result
            .directives
            .iter()
            .map(|d| d.value.type_name())
            .collect();
        assert_eq!(names, vec!["open", "close"]);
    }

    #[test]
    fn test_invalid_date() {
        let result = parse("2024-13-01 open Assets:Cash\n");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ParseErrorKind::InvalidDate("2024-13-01".to_string()));
    }

    #[test]
    fn test_org_mode_headings_and_comments_are_skipped() {
        let source = "* Accounts\n; a comment\n2024-01-01 open Assets:Cash ; trailing\n";
        let Directive::Open(open) = only_directive(source) else {
            panic!("expected open");
        };
        assert_eq!(open.account, "Assets:Cash");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#""a \"quoted\" word""#), "a \"quoted\" word");
        assert_eq!(unescape(r#""tab\there""#), "tab\there");
    }

    #[test]
    fn test_padding_flag_transaction() {
        let source = "2024-01-01 P \"(Padding inserted for Balance of 100 USD for difference 100 USD)\"\n  Assets:Cash  100 USD\n  Equity:Opening  -100 USD\n";
        let Directive::Transaction(txn) = only_directive(source) else {
            panic!("expected transaction");
        };
        assert_eq!(txn.flag, 'P');
    }
}
