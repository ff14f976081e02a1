//! Command implementations for CLI tools.
//!
//! The implementation lives here so the binary stays a thin wrapper.

pub mod check;
