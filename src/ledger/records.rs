use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{
    AccountId, BankId, DetailLevel, PartnerBankId, PartnerId, PaymentMethodId, PaymentTermId,
    ProductId, TaxId, TaxUse, WithholdingKind, WithholdingTaxId,
};

/// Ledger business partner. Identity is the VAT number (normalized) or the
/// fiscal code; at most one commercial group may own a given identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub is_company: bool,
    pub vat: Option<String>,
    pub fiscal_code: Option<String>,
    pub eori_code: Option<String>,
    pub country: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    /// Province code, resolved against the province table.
    pub province: Option<String>,
    /// Top-level commercial partner this contact belongs to; None when the
    /// partner is itself the commercial record.
    pub commercial_parent: Option<PartnerId>,
    /// When set, imports never overwrite address/contact data.
    pub no_contact_update: bool,
    /// Preferred import detail level for documents from this partner.
    pub detail_level: Option<DetailLevel>,
    /// Product used for synthesized lines when none can be resolved.
    pub default_product: Option<ProductId>,
    pub payment_term: Option<PaymentTermId>,
    // Professional-register data (supplier role).
    pub register: Option<String>,
    pub register_province: Option<String>,
    pub register_code: Option<String>,
    pub register_date: Option<NaiveDate>,
    /// RFxx fiscal-regime code.
    pub fiscal_regime: Option<String>,
    // REA company-registry data.
    pub rea_office: Option<String>,
    pub rea_code: Option<String>,
    pub rea_capital: Option<Decimal>,
    pub rea_member_type: Option<String>,
    pub rea_liquidation_state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Carrier driving licence (delivery block).
    pub license_number: Option<String>,
    /// SDI recipient code for outbound documents ("0000000" when absent).
    pub codice_destinatario: Option<String>,
    /// Certified-mail recipient address for outbound documents.
    pub pec: Option<String>,
}

/// Configured tax. Distinct records may share a rate; disambiguation goes
/// through the company default tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: TaxId,
    pub description: String,
    pub tax_use: TaxUse,
    /// Percentage rate.
    pub rate: Decimal,
    pub price_include: bool,
    /// Nature code (N1–N7) classifying a zero-rate tax.
    pub nature: Option<String>,
    /// True for parent taxes with child components (partially deductible
    /// VAT); these are never auto-selected on the purchase side.
    pub has_children: bool,
    /// Search ordering; lower wins when several candidates match.
    pub priority: u32,
}

/// Configured withholding tax, matched by (reason, rate, kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithholdingTax {
    pub id: WithholdingTaxId,
    pub description: String,
    /// Percentage rate.
    pub rate: Decimal,
    pub kind: WithholdingKind,
    /// CausalePagamento reason code this tax is configured for.
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub expense_account: Option<AccountId>,
    pub supplier_taxes: Vec<TaxId>,
    pub sale_taxes: Vec<TaxId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub taxes: Vec<TaxId>,
}

/// Bank registry record (looked up by BIC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: BankId,
    pub name: String,
    pub bic: String,
}

/// Bank account held by a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerBank {
    pub id: PartnerBankId,
    pub partner: PartnerId,
    pub iban: String,
    pub bank: Option<BankId>,
    pub bank_name: Option<String>,
    pub bic: Option<String>,
}

/// Accounting payment term. The fiscal codes are what outbound documents
/// must carry; both must be present before export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTerm {
    pub id: PaymentTermId,
    pub name: String,
    /// TPxx fiscal payment-term code.
    pub fiscal_code: Option<String>,
    /// Fiscal payment method used when exporting with this term.
    pub fiscal_method: Option<PaymentMethodId>,
}

/// Fiscal payment method (MPxx).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    pub code: String,
}
