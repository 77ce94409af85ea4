//! Repository collaborators: typed store traits, reference code tables and
//! company configuration, plus an in-memory implementation.
//!
//! The persistent store behind these traits is external to this crate; the
//! import/export engines only ever go through this surface, so embedders
//! can back it with any ORM and tests run against [`MemoryLedger`].

mod memory;
mod records;
mod tables;

pub use memory::MemoryLedger;
pub use records::*;
pub use tables::{CodeTable, CodeTables};

use chrono::NaiveDate;

use crate::core::{
    AccountId, BankId, DetailLevel, FatturaError, Invoice, InvoiceId, PartnerBankId, PartnerId,
    PaymentMethodId, PaymentTermId, ProductId, TaxId, TaxUse, WithholdingTaxId,
};

/// Which date an inbound invoice is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationDatePolicy {
    /// Date the e-invoice was received from the exchange system.
    ReceivedDate,
    /// Date declared on the document.
    #[default]
    DocumentDate,
}

/// Per-company configuration consumed by the import and export engines.
#[derive(Debug, Clone, Default)]
pub struct CompanyConfig {
    pub name: String,
    /// VAT country prefix, e.g. "IT".
    pub vat_country: String,
    /// Numeric VAT code without the country prefix.
    pub vat_code: String,
    pub fiscal_code: Option<String>,
    /// RFxx code used in outbound headers.
    pub fiscal_regime: String,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// IdTrasmittente for outbound transmissions.
    pub transmitter_country: String,
    pub transmitter_code: String,
    pub registration_date_policy: RegistrationDatePolicy,
    /// Default expense account of the purchase journal.
    pub purchase_account: Option<AccountId>,
    /// Default income account of the sale journal.
    pub sale_account: Option<AccountId>,
    /// Account for positive rounding adjustments.
    pub rounding_loss_account: Option<AccountId>,
    /// Account for negative rounding adjustments.
    pub rounding_gain_account: Option<AccountId>,
    pub rounding_tax: Option<TaxId>,
    pub default_purchase_tax: Option<TaxId>,
    pub default_sale_tax: Option<TaxId>,
    /// Product substituted on global discount/surcharge lines.
    pub global_discount_product: Option<ProductId>,
    /// Product substituted on welfare-fund lines.
    pub welfare_fund_product: Option<ProductId>,
    /// Company-wide default detail level (partner settings win).
    pub detail_level: DetailLevel,
}

impl CompanyConfig {
    pub fn new(
        name: impl Into<String>,
        vat_country: impl Into<String>,
        vat_code: impl Into<String>,
    ) -> Self {
        let vat_country = vat_country.into();
        Self {
            name: name.into(),
            country: vat_country.clone(),
            transmitter_country: vat_country.clone(),
            vat_country,
            vat_code: vat_code.into(),
            fiscal_regime: "RF01".into(),
            ..Default::default()
        }
    }

    /// Full country-prefixed VAT number.
    pub fn vat(&self) -> String {
        format!("{}{}", self.vat_country, self.vat_code)
    }

    /// Default account of the journal for the given direction; required to
    /// post anything, hence fatal when unset.
    pub fn journal_account(&self, tax_use: TaxUse) -> Result<AccountId, FatturaError> {
        let (account, side) = match tax_use {
            TaxUse::Purchase => (self.purchase_account, "purchase"),
            TaxUse::Sale => (self.sale_account, "sale"),
        };
        account.ok_or_else(|| {
            FatturaError::MissingConfiguration(format!(
                "no {side} journal defined for company '{}'",
                self.name
            ))
        })
    }

    /// Default tax used to break rate ties for the given direction.
    pub fn default_tax(&self, tax_use: TaxUse) -> Option<TaxId> {
        match tax_use {
            TaxUse::Purchase => self.default_purchase_tax,
            TaxUse::Sale => self.default_sale_tax,
        }
    }
}

/// The repository surface consumed by import and export.
///
/// Search operations return id lists ordered the way the store orders them
/// (taxes by priority); browse operations return owned records.
pub trait Ledger {
    // -- partners -----------------------------------------------------------
    fn search_partners_by_vat(&self, vat: &str) -> Vec<PartnerId>;
    fn search_partners_by_fiscal_code(&self, fiscal_code: &str) -> Vec<PartnerId>;
    /// Partners carrying the given REA registry code, excluding `except`.
    fn search_partners_by_rea_code(&self, rea_code: &str, except: PartnerId) -> Vec<PartnerId>;
    fn partner(&self, id: PartnerId) -> Option<Partner>;
    fn create_partner(&mut self, partner: Partner) -> PartnerId;
    fn write_partner(&mut self, partner: Partner);

    // -- taxes --------------------------------------------------------------
    /// All taxes for one direction, ordered by priority.
    fn taxes(&self, tax_use: TaxUse) -> Vec<TaxRecord>;
    fn tax(&self, id: TaxId) -> Option<TaxRecord>;
    fn withholding_taxes(&self) -> Vec<WithholdingTax>;
    fn withholding_tax(&self, id: WithholdingTaxId) -> Option<WithholdingTax>;

    // -- products / accounts ------------------------------------------------
    /// Products registered under a supplier's article code.
    fn supplier_products(&self, partner: PartnerId, code: &str) -> Vec<ProductId>;
    /// Products matched by our own internal reference code.
    fn products_by_code(&self, code: &str) -> Vec<ProductId>;
    fn product(&self, id: ProductId) -> Option<Product>;
    fn account(&self, id: AccountId) -> Option<Account>;

    // -- banking ------------------------------------------------------------
    fn bank_by_bic(&self, bic: &str) -> Option<Bank>;
    fn create_bank(&mut self, name: &str, bic: &str) -> BankId;
    fn partner_bank_by_iban(&self, partner: PartnerId, iban: &str) -> Option<PartnerBankId>;
    fn create_partner_bank(&mut self, bank: PartnerBank) -> PartnerBankId;

    // -- payment codes ------------------------------------------------------
    fn payment_term_by_fiscal_code(&self, code: &str) -> Option<PaymentTermId>;
    fn payment_term(&self, id: PaymentTermId) -> Option<PaymentTerm>;
    fn payment_method_by_code(&self, code: &str) -> Option<PaymentMethodId>;
    fn payment_method(&self, id: PaymentMethodId) -> Option<PaymentMethod>;

    // -- invoices -----------------------------------------------------------
    fn create_invoice(&mut self, invoice: Invoice) -> InvoiceId;
    fn invoice(&self, id: InvoiceId) -> Option<Invoice>;
    fn write_invoice(&mut self, invoice: Invoice);

    // -- idempotence guards -------------------------------------------------
    fn file_processed(&self, name: &str) -> bool;
    fn mark_file_processed(&mut self, name: &str);
    fn export_name_exists(&self, transmission_id: &str) -> bool;
    fn record_export_name(&mut self, transmission_id: &str);
}

/// Convenience: the commercial (top-level) partner of a record.
pub fn commercial_partner<L: Ledger + ?Sized>(ledger: &L, id: PartnerId) -> PartnerId {
    let mut current = id;
    // Bounded walk; partner hierarchies are shallow and acyclic.
    for _ in 0..16 {
        match ledger.partner(current).and_then(|p| p.commercial_parent) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Received date wins only when the policy says so and one exists.
pub fn registration_date(
    policy: RegistrationDatePolicy,
    document_date: NaiveDate,
    received_date: Option<NaiveDate>,
) -> NaiveDate {
    match (policy, received_date) {
        (RegistrationDatePolicy::ReceivedDate, Some(received)) => received,
        _ => document_date,
    }
}
