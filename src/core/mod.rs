//! Ledger-facing data model for FatturaPA import and export.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! The aggregate mirrors the field contract of the accounting ledger this
//! engine feeds; the statutory XML tree lives in [`crate::schema`].

mod error;
mod types;

pub use error::*;
pub use types::*;
