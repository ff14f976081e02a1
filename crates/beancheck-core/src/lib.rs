//! Core types for beancheck
//!
//! This crate provides the ledger data model shared by the parser, loader,
//! booking, validation and summary crates:
//!
//! - [`Amount`] - A decimal number with a currency
//! - [`CostSpec`] - Cost annotation written on a posting
//! - [`Directive`] - All directive types (Transaction, Balance, Open, etc.)
//! - [`Inventory`] - Per-currency running balance of an account
//! - [`DisplayContext`] - Per-currency number formatting for reports
//! - [`flags`] - The flag characters used by the ledger format
//!
//! # Example
//!
//! ```
//! use beancheck_core::{Amount, Inventory};
//! use rust_decimal_macros::dec;
//!
//! let mut inv = Inventory::new();
//! inv.add(&Amount::new(dec!(10.00), "USD"));
//! inv.add(&Amount::new(dec!(-2.50), "USD"));
//!
//! assert_eq!(inv.units("USD"), dec!(7.50));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;
pub mod display;
pub mod flags;
pub mod inventory;
pub mod meta;

pub use amount::{Amount, IncompleteAmount};
pub use cost::CostSpec;
pub use directive::{
    sort_directives, Balance, Close, Commodity, Custom, Directive, DirectivePriority, Document,
    Event, MetaValue, Metadata, Note, Open, Pad, Posting, Price, PriceAnnotation, Query,
    Transaction,
};
pub use display::DisplayContext;
pub use inventory::Inventory;
pub use meta::SourceLocation;

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
