//! Directive types representing the dated entries of a ledger.
//!
//! - [`Transaction`] - transfers between accounts, made of [`Posting`]s
//! - [`Open`] / [`Close`] - account lifecycle
//! - [`Balance`] / [`Pad`] - balance assertions and the padding that satisfies them
//! - [`Commodity`], [`Price`], [`Note`], [`Event`], [`Document`], [`Query`], [`Custom`]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::meta::{self, SourceLocation};
use crate::{Amount, CostSpec, IncompleteAmount};

/// Metadata value types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaValue {
    /// String value
    String(String),
    /// Account reference
    Account(String),
    /// Currency code
    Currency(String),
    /// Tag reference
    Tag(String),
    /// Link reference
    Link(String),
    /// Date value
    Date(NaiveDate),
    /// Numeric value
    Number(Decimal),
    /// Boolean value
    Bool(bool),
    /// Amount value
    Amount(Amount),
    /// Null/None value
    None,
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Account(s) | Self::Currency(s) => write!(f, "{s}"),
            Self::Tag(t) => write!(f, "#{t}"),
            Self::Link(l) => write!(f, "^{l}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::Amount(a) => write!(f, "{a}"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Metadata is a key-value map attached to directives and postings.
pub type Metadata = HashMap<String, MetaValue>;

/// A posting within a transaction.
///
/// When `units` is `None` the whole amount is left to interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// The account for this posting
    pub account: String,
    /// The units (may be incomplete or None for auto-calculated postings)
    pub units: Option<IncompleteAmount>,
    /// Cost specification for the position
    pub cost: Option<CostSpec>,
    /// Price annotation (@ or @@)
    pub price: Option<PriceAnnotation>,
    /// Posting flag, e.g. `!`
    pub flag: Option<char>,
    /// Posting metadata
    pub meta: Metadata,
}

impl Posting {
    /// Create a new posting with the given account and complete units.
    #[must_use]
    pub fn new(account: impl Into<String>, units: Amount) -> Self {
        Self {
            units: Some(IncompleteAmount::Complete(units)),
            ..Self::auto(account)
        }
    }

    /// Create a posting without any amount (to be fully interpolated).
    #[must_use]
    pub fn auto(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            units: None,
            cost: None,
            price: None,
            flag: None,
            meta: Metadata::new(),
        }
    }

    /// Get the complete amount if available.
    #[must_use]
    pub fn amount(&self) -> Option<&Amount> {
        self.units.as_ref().and_then(IncompleteAmount::as_amount)
    }

    /// Add a cost specification.
    #[must_use]
    pub fn with_cost(mut self, cost: CostSpec) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Add a price annotation.
    #[must_use]
    pub fn with_price(mut self, price: PriceAnnotation) -> Self {
        self.price = Some(price);
        self
    }

    /// Add a flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Whether the amount of this posting was filled in by interpolation.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        matches!(
            self.meta.get(meta::AUTOMATIC),
            Some(MetaValue::Bool(true))
        )
    }

    /// Source location of this posting, if the loader recorded one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation<'_>> {
        SourceLocation::from_meta(&self.meta)
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        if let Some(flag) = self.flag {
            write!(f, "{flag} ")?;
        }
        write!(f, "{}", self.account)?;
        if let Some(units) = &self.units {
            write!(f, "  {units}")?;
        }
        if let Some(cost) = &self.cost {
            write!(f, " {cost}")?;
        }
        if let Some(price) = &self.price {
            write!(f, " {price}")?;
        }
        Ok(())
    }
}

/// Price annotation for a posting (@ or @@).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceAnnotation {
    /// Per-unit price (`@ 1.10 USD`)
    Unit(Amount),
    /// Total price (`@@ 110 USD`)
    Total(Amount),
}

impl PriceAnnotation {
    /// The written amount.
    #[must_use]
    pub const fn amount(&self) -> &Amount {
        match self {
            Self::Unit(a) | Self::Total(a) => a,
        }
    }

    /// Value of `units` converted at this price.
    #[must_use]
    pub fn convert(&self, units: &Amount) -> Amount {
        match self {
            Self::Unit(price) => Amount::new(units.number * price.number, price.currency.clone()),
            Self::Total(total) if units.number.is_sign_negative() => -total,
            Self::Total(total) => total.clone(),
        }
    }
}

impl fmt::Display for PriceAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(a) => write!(f, "@ {a}"),
            Self::Total(a) => write!(f, "@@ {a}"),
        }
    }
}

/// Directive ordering priority for sorting.
///
/// When directives have the same date, they are sorted by type priority
/// so that accounts exist before use and close after all activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectivePriority {
    /// Open accounts first so they exist before use
    Open = 0,
    /// Commodities declared before use
    Commodity = 1,
    /// Padding before balance assertions
    Pad = 2,
    /// Balance assertions checked at start of day
    Balance = 3,
    /// Main entries
    Transaction = 4,
    /// Annotations after transactions
    Note = 5,
    /// Attachments after transactions
    Document = 6,
    /// State changes
    Event = 7,
    /// Queries defined after data
    Query = 8,
    /// Prices at end of day
    Price = 9,
    /// Accounts closed after all activity
    Close = 10,
    /// User extensions last
    Custom = 11,
}

/// All directive types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Transfers between accounts
    Transaction(Transaction),
    /// Balance assertion
    Balance(Balance),
    /// Account open
    Open(Open),
    /// Account close
    Close(Close),
    /// Commodity declaration
    Commodity(Commodity),
    /// Pad an account up to the next balance assertion
    Pad(Pad),
    /// Life event
    Event(Event),
    /// Named query
    Query(Query),
    /// Account note
    Note(Note),
    /// Account document
    Document(Document),
    /// Commodity price
    Price(Price),
    /// User-defined directive
    Custom(Custom),
}

macro_rules! each_directive {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Directive::Transaction($d) => $body,
            Directive::Balance($d) => $body,
            Directive::Open($d) => $body,
            Directive::Close($d) => $body,
            Directive::Commodity($d) => $body,
            Directive::Pad($d) => $body,
            Directive::Event($d) => $body,
            Directive::Query($d) => $body,
            Directive::Note($d) => $body,
            Directive::Document($d) => $body,
            Directive::Price($d) => $body,
            Directive::Custom($d) => $body,
        }
    };
}

impl Directive {
    /// Get the date of this directive.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        each_directive!(self, d => d.date)
    }

    /// Get the metadata of this directive.
    #[must_use]
    pub const fn meta(&self) -> &Metadata {
        each_directive!(self, d => &d.meta)
    }

    /// Get the metadata of this directive mutably.
    pub fn meta_mut(&mut self) -> &mut Metadata {
        each_directive!(self, d => &mut d.meta)
    }

    /// Source location of this directive, if the loader recorded one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation<'_>> {
        SourceLocation::from_meta(self.meta())
    }

    /// Get as a transaction, if this is one.
    #[must_use]
    pub const fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(t) => Some(t),
            _ => None,
        }
    }

    /// Get the directive type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Balance(_) => "balance",
            Self::Open(_) => "open",
            Self::Close(_) => "close",
            Self::Commodity(_) => "commodity",
            Self::Pad(_) => "pad",
            Self::Event(_) => "event",
            Self::Query(_) => "query",
            Self::Note(_) => "note",
            Self::Document(_) => "document",
            Self::Price(_) => "price",
            Self::Custom(_) => "custom",
        }
    }

    /// Get the sorting priority for this directive.
    #[must_use]
    pub const fn priority(&self) -> DirectivePriority {
        match self {
            Self::Open(_) => DirectivePriority::Open,
            Self::Commodity(_) => DirectivePriority::Commodity,
            Self::Pad(_) => DirectivePriority::Pad,
            Self::Balance(_) => DirectivePriority::Balance,
            Self::Transaction(_) => DirectivePriority::Transaction,
            Self::Note(_) => DirectivePriority::Note,
            Self::Document(_) => DirectivePriority::Document,
            Self::Event(_) => DirectivePriority::Event,
            Self::Query(_) => DirectivePriority::Query,
            Self::Price(_) => DirectivePriority::Price,
            Self::Close(_) => DirectivePriority::Close,
            Self::Custom(_) => DirectivePriority::Custom,
        }
    }
}

/// Sort directives by date, then by type priority.
///
/// Stable: directives with the same date and type keep file order.
pub fn sort_directives(directives: &mut [Directive]) {
    directives.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.priority().cmp(&b.priority()))
    });
}

/// A transaction directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date
    pub date: NaiveDate,
    /// Transaction flag (`*`, `!`, `P`, ...)
    pub flag: char,
    /// Payee (optional)
    pub payee: Option<String>,
    /// Narration (description)
    pub narration: String,
    /// Tags attached to this transaction
    pub tags: Vec<String>,
    /// Links attached to this transaction
    pub links: Vec<String>,
    /// Transaction metadata
    pub meta: Metadata,
    /// Postings (account entries)
    pub postings: Vec<Posting>,
}

impl Transaction {
    /// Create a new transaction.
    #[must_use]
    pub fn new(date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            date,
            flag: '*',
            payee: None,
            narration: narration.into(),
            tags: Vec::new(),
            links: Vec::new(),
            meta: Metadata::new(),
            postings: Vec::new(),
        }
    }

    /// Set the flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = flag;
        self
    }

    /// Set the payee.
    #[must_use]
    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a link.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Add a posting.
    #[must_use]
    pub fn with_posting(mut self, posting: Posting) -> Self {
        self.postings.push(posting);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Source location of this transaction, if the loader recorded one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation<'_>> {
        SourceLocation::from_meta(&self.meta)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.date, self.flag)?;
        if let Some(payee) = &self.payee {
            write!(f, "\"{payee}\" ")?;
        }
        write!(f, "\"{}\"", self.narration)?;
        for tag in &self.tags {
            write!(f, " #{tag}")?;
        }
        for link in &self.links {
            write!(f, " ^{link}")?;
        }
        for posting in &self.postings {
            write!(f, "\n{posting}")?;
        }
        Ok(())
    }
}

/// A balance assertion, checked at the beginning of `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Assertion date
    pub date: NaiveDate,
    /// Account to check
    pub account: String,
    /// Expected amount
    pub amount: Amount,
    /// Explicit tolerance (`~ 0.01`)
    pub tolerance: Option<Decimal>,
    /// Metadata
    pub meta: Metadata,
}

impl Balance {
    /// Create a new balance assertion.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            account: account.into(),
            amount,
            tolerance: None,
            meta: Metadata::new(),
        }
    }
}

/// Opens an account, optionally restricting its currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Open {
    /// Date account was opened
    pub date: NaiveDate,
    /// Account name (e.g., "Assets:Bank:Checking")
    pub account: String,
    /// Allowed currencies (empty = any currency allowed)
    pub currencies: Vec<String>,
    /// Booking method for this account
    pub booking: Option<String>,
    /// Metadata
    pub meta: Metadata,
}

impl Open {
    /// Create a new open directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<String>) -> Self {
        Self {
            date,
            account: account.into(),
            currencies: Vec::new(),
            booking: None,
            meta: Metadata::new(),
        }
    }

    /// Set allowed currencies.
    #[must_use]
    pub fn with_currencies(mut self, currencies: Vec<String>) -> Self {
        self.currencies = currencies;
        self
    }
}

/// Closes an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close {
    /// Date account was closed
    pub date: NaiveDate,
    /// Account name
    pub account: String,
    /// Metadata
    pub meta: Metadata,
}

impl Close {
    /// Create a new close directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<String>) -> Self {
        Self {
            date,
            account: account.into(),
            meta: Metadata::new(),
        }
    }
}

/// Declares a commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    /// Declaration date
    pub date: NaiveDate,
    /// Currency/commodity code (e.g., "USD", "AAPL")
    pub currency: String,
    /// Metadata
    pub meta: Metadata,
}

/// Inserts a padding transaction from `source_account` so that `account`
/// matches its next balance assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad date
    pub date: NaiveDate,
    /// Account to pad
    pub account: String,
    /// Source account for padding (e.g., Equity:Opening-Balances)
    pub source_account: String,
    /// Metadata
    pub meta: Metadata,
}

impl Pad {
    /// Create a new pad directive.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        account: impl Into<String>,
        source_account: impl Into<String>,
    ) -> Self {
        Self {
            date,
            account: account.into(),
            source_account: source_account.into(),
            meta: Metadata::new(),
        }
    }
}

/// Records a life event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event date
    pub date: NaiveDate,
    /// Event type (e.g., "location")
    pub event_type: String,
    /// Event value
    pub value: String,
    /// Metadata
    pub meta: Metadata,
}

/// Stores a named query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Query date
    pub date: NaiveDate,
    /// Query name
    pub name: String,
    /// Query text
    pub query: String,
    /// Metadata
    pub meta: Metadata,
}

/// Attaches a note to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note date
    pub date: NaiveDate,
    /// Account
    pub account: String,
    /// Note text
    pub comment: String,
    /// Metadata
    pub meta: Metadata,
}

/// Links a document to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document date
    pub date: NaiveDate,
    /// Account
    pub account: String,
    /// Path to the document
    pub path: String,
    /// Metadata
    pub meta: Metadata,
}

/// Records the price of a commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price date
    pub date: NaiveDate,
    /// Commodity being priced
    pub currency: String,
    /// Price in another currency
    pub amount: Amount,
    /// Metadata
    pub meta: Metadata,
}

/// A user-defined directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custom {
    /// Directive date
    pub date: NaiveDate,
    /// Custom type name
    pub custom_type: String,
    /// Values
    pub values: Vec<MetaValue>,
    /// Metadata
    pub meta: Metadata,
}
