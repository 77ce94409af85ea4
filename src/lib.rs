//! # fatturapa
//!
//! Italian e-invoicing library: ingest statutory FatturaPA XML documents,
//! map them onto a normalized accounting-ledger model with full
//! reconciliation, and serialize ledger invoices back to conformant XML.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating
//! point. Failures follow a two-tier taxonomy: fatal errors
//! ([`core::FatturaError`]) abort the current body section or export
//! batch, while advisories ([`core::Inconsistencies`]) accumulate into
//! the invoice's review log without ever blocking creation.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fatturapa::batch::{import_batch, BatchOptions};
//! use fatturapa::ledger::{CodeTables, CompanyConfig, MemoryLedger};
//!
//! let mut ledger = MemoryLedger::new();
//! let tables = CodeTables::italian_defaults();
//! let config = CompanyConfig::new("ACME SRL", "IT", "01234567890");
//!
//! let outcome = import_batch(
//!     &mut ledger,
//!     &tables,
//!     &config,
//!     files, // (file name, bytes) pairs, e.g. from an extracted archive
//!     &BatchOptions::default(),
//! );
//! for (name, error) in &outcome.errors {
//!     eprintln!("{name}: {error}");
//! }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Ledger model, error/advisory types, repository traits |
//! | `xml` | FatturaPA schema binding (parse + write) |
//! | `import` | Partner/tax resolvers, line mapper, document assembler, batch |
//! | `export` | Export assembler (grouping, chunking, serialization) |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod ledger;

#[cfg(feature = "xml")]
pub mod schema;

#[cfg(feature = "import")]
pub mod import;

#[cfg(feature = "import")]
pub mod batch;

#[cfg(feature = "export")]
pub mod export;

// Re-export the ledger model at the crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
