use thiserror::Error;

/// Fatal errors — these abort the current body section or export batch.
///
/// Everything recoverable ("please review" rather than "cannot continue")
/// goes through [`Inconsistencies`] instead and never interrupts processing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FatturaError {
    /// A required code-table lookup failed (document type, country,
    /// fiscal regime, payment term/method, withholding tax, …).
    #[error("unknown {table} code: {code}")]
    UnknownCode { table: &'static str, code: String },

    /// Two distinct commercial partners already match the same identity.
    #[error(
        "two distinct partners with VAT number {vat} or fiscal code {fiscal_code} already present"
    )]
    AmbiguousPartner { vat: String, fiscal_code: String },

    /// Required company configuration is missing.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// Invoices passed to one export call belong to different partners.
    #[error("invoices {0} must belong to the same partner")]
    MixedPartners(String),

    /// A file with this name was already imported.
    #[error("file {0} has already been processed")]
    DuplicateFile(String),

    /// The document declares data this engine cannot honor.
    #[error("{0}")]
    Document(String),

    /// XML parse or generation failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// A mandatory schema element is absent from the document.
    #[error("missing mandatory element {0}")]
    MissingElement(&'static str),

    /// Repository returned no record for an id it previously issued.
    #[error("dangling {entity} id {id}")]
    Dangling { entity: &'static str, id: u32 },
}

/// Accumulating advisory log attached to an imported invoice.
///
/// The original system smuggled these messages through an ambient request
/// context; here they are an explicit value threaded through every resolver
/// and mapper call and merged by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inconsistencies {
    messages: Vec<String>,
}

impl Inconsistencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one advisory message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Absorb another log, preserving order.
    pub fn merge(&mut self, other: Inconsistencies) {
        self.messages.extend(other.messages);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// The newline-joined free-text form stored on the invoice.
    pub fn into_text(self) -> String {
        self.messages.join("\n")
    }
}

impl std::fmt::Display for Inconsistencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, m) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{m}")?;
        }
        Ok(())
    }
}
