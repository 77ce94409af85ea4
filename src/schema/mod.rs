//! FatturaPA schema binding: typed document tree, parser and writer.
//!
//! This layer converts between raw XML bytes and the typed object graph.
//! It knows nothing about the ledger; mapping lives in [`crate::import`]
//! and [`crate::export`].

mod parse;
mod types;
mod write;
pub(crate) mod xml;

pub use parse::parse;
pub use types::*;
pub use write::write;
pub use xml::format_decimal;
