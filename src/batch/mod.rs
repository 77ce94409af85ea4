//! Batch orchestration: feed many XML files through the import engine.
//!
//! ZIP extraction and upload mechanics live upstream; this layer consumes
//! `(file name, bytes)` pairs, classifies each document up front
//! (self-issued documents are filed as outbound, never as vendor bills),
//! guards against re-importing a processed file name, and isolates
//! failures per file and per body section.

use tracing::{info, warn};

use crate::core::{DetailLevel, FatturaError, InvoiceId};
use crate::import::{import_document, BodyFailure, ImportContext, ImportDirection};
use crate::ledger::{CodeTables, CompanyConfig, Ledger};
use crate::schema::{self, FatturaElettronica};

/// Batch-wide options.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Detail-level override applied to every file in the batch.
    pub detail_level: Option<DetailLevel>,
}

/// Result of one successfully parsed file.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub classification: ImportDirection,
    pub invoices: Vec<InvoiceId>,
    pub failures: Vec<BodyFailure>,
}

/// Aggregated batch result: per-file outcomes plus per-file fatal errors.
/// A fatal error in one file never rolls back invoices committed for
/// earlier files.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub files: Vec<FileOutcome>,
    pub errors: Vec<(String, FatturaError)>,
}

impl BatchOutcome {
    pub fn created_invoices(&self) -> impl Iterator<Item = InvoiceId> + '_ {
        self.files.iter().flat_map(|f| f.invoices.iter().copied())
    }
}

/// Classify a parsed document before any record is created: a declared
/// supplier VAT matching the importing company's own VAT means the
/// document is one of ours and must be filed as outbound, with the
/// declared customer as its counterparty.
pub fn classify_document(doc: &FatturaElettronica, config: &CompanyConfig) -> ImportDirection {
    let supplier_vat = doc
        .header
        .cedente_prestatore
        .as_ref()
        .and_then(|c| c.dati_anagrafici.as_ref())
        .and_then(|da| da.id_fiscale_iva.as_ref())
        .and_then(|id| {
            let paese = id.id_paese.as_deref()?;
            let codice = id.id_codice.as_deref()?;
            Some(crate::import::normalize_vat(paese, codice, &config.country))
        });
    if supplier_vat.as_deref() == Some(config.vat().as_str()) {
        ImportDirection::Outbound
    } else {
        ImportDirection::Inbound
    }
}

/// Import a single named XML document.
pub fn import_file<L: Ledger>(
    ledger: &mut L,
    tables: &CodeTables,
    config: &CompanyConfig,
    file_name: &str,
    bytes: &[u8],
    options: &BatchOptions,
) -> Result<FileOutcome, FatturaError> {
    if ledger.file_processed(file_name) {
        return Err(FatturaError::DuplicateFile(file_name.to_string()));
    }

    let text = decode_utf8(bytes)?;
    let doc = schema::parse(&text)?;
    let classification = classify_document(&doc, config);

    let context = ImportContext {
        file_name: Some(file_name.to_string()),
        // Self-contained archives carry no received date; registration
        // falls back to the document date.
        received_date: None,
        detail_level: options.detail_level,
        direction: classification,
    };
    let outcome = import_document(ledger, tables, config, &doc, &context)?;
    ledger.mark_file_processed(file_name);
    info!(
        file_name,
        outbound = (classification == ImportDirection::Outbound),
        invoices = outcome.invoices.len(),
        failures = outcome.failures.len(),
        "file imported"
    );
    Ok(FileOutcome {
        file_name: file_name.to_string(),
        classification,
        invoices: outcome.invoices,
        failures: outcome.failures,
    })
}

/// Import a whole batch, one file at a time, aggregating outcomes.
pub fn import_batch<L: Ledger>(
    ledger: &mut L,
    tables: &CodeTables,
    config: &CompanyConfig,
    files: impl IntoIterator<Item = (String, Vec<u8>)>,
    options: &BatchOptions,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (name, bytes) in files {
        match import_file(ledger, tables, config, &name, &bytes, options) {
            Ok(file) => outcome.files.push(file),
            Err(error) => {
                warn!(file_name = %name, %error, "file skipped");
                outcome.errors.push((name, error));
            }
        }
    }
    outcome
}

fn decode_utf8(bytes: &[u8]) -> Result<String, FatturaError> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| FatturaError::Xml(format!("document is not valid UTF-8: {e}")))
}
