//! Import engine: XML-to-ledger mapping and reconciliation.
//!
//! Resolvers and mappers are free functions over the [`crate::ledger`]
//! traits; every advisory goes through an explicit [`Inconsistencies`]
//! value, never an ambient side channel.
//!
//! [`Inconsistencies`]: crate::core::Inconsistencies

mod assembler;
mod consistency;
mod lines;
mod partner;
mod tax;

pub use assembler::{
    import_document, BodyFailure, ImportContext, ImportDirection, ImportOutcome,
};
pub use consistency::check as check_consistency;
pub use lines::{adjust_accounting_data, derive_discount, map_lines, resolve_line_product};
pub use partner::{
    normalize_vat, resolve_carrier, resolve_customer, resolve_partner, resolve_supplier,
};
pub use tax::resolve_tax;
