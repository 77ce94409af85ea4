use std::collections::{BTreeMap, BTreeSet};

use super::records::*;
use super::Ledger;
use crate::core::{
    AccountId, BankId, Invoice, InvoiceId, PartnerBankId, PartnerId, PaymentMethodId,
    PaymentTermId, ProductId, TaxId, TaxUse, WithholdingTaxId,
};

/// In-memory [`Ledger`] used by the test-suite and by embedders that do not
/// plug a persistent store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    partners: BTreeMap<u32, Partner>,
    taxes: BTreeMap<u32, TaxRecord>,
    withholding_taxes: BTreeMap<u32, WithholdingTax>,
    products: BTreeMap<u32, Product>,
    accounts: BTreeMap<u32, Account>,
    banks: BTreeMap<u32, Bank>,
    partner_banks: BTreeMap<u32, PartnerBank>,
    payment_terms: BTreeMap<u32, PaymentTerm>,
    payment_methods: BTreeMap<u32, PaymentMethod>,
    invoices: BTreeMap<u32, Invoice>,
    /// (partner, supplier article code) → product.
    supplier_codes: Vec<(PartnerId, String, ProductId)>,
    /// internal reference code → product.
    product_codes: Vec<(String, ProductId)>,
    processed_files: BTreeSet<String>,
    export_names: BTreeSet<String>,
    next_id: u32,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    // -- fixture helpers ----------------------------------------------------

    pub fn insert_tax(&mut self, mut tax: TaxRecord) -> TaxId {
        let id = TaxId(self.bump());
        tax.id = id;
        self.taxes.insert(id.0, tax);
        id
    }

    pub fn insert_withholding_tax(&mut self, mut wt: WithholdingTax) -> WithholdingTaxId {
        let id = WithholdingTaxId(self.bump());
        wt.id = id;
        self.withholding_taxes.insert(id.0, wt);
        id
    }

    pub fn insert_product(&mut self, mut product: Product) -> ProductId {
        let id = ProductId(self.bump());
        product.id = id;
        self.products.insert(id.0, product);
        id
    }

    pub fn insert_account(&mut self, mut account: Account) -> AccountId {
        let id = AccountId(self.bump());
        account.id = id;
        self.accounts.insert(id.0, account);
        id
    }

    pub fn insert_payment_term(&mut self, mut term: PaymentTerm) -> PaymentTermId {
        let id = PaymentTermId(self.bump());
        term.id = id;
        self.payment_terms.insert(id.0, term);
        id
    }

    pub fn insert_payment_method(&mut self, mut method: PaymentMethod) -> PaymentMethodId {
        let id = PaymentMethodId(self.bump());
        method.id = id;
        self.payment_methods.insert(id.0, method);
        id
    }

    /// Register a supplier article code for product resolution.
    pub fn register_supplier_code(
        &mut self,
        partner: PartnerId,
        code: impl Into<String>,
        product: ProductId,
    ) {
        self.supplier_codes.push((partner, code.into(), product));
    }

    /// Register an internal reference code for product resolution.
    pub fn register_product_code(&mut self, code: impl Into<String>, product: ProductId) {
        self.product_codes.push((code.into(), product));
    }

    pub fn invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.values()
    }
}

impl Ledger for MemoryLedger {
    fn search_partners_by_vat(&self, vat: &str) -> Vec<PartnerId> {
        self.partners
            .values()
            .filter(|p| p.vat.as_deref() == Some(vat))
            .map(|p| p.id)
            .collect()
    }

    fn search_partners_by_fiscal_code(&self, fiscal_code: &str) -> Vec<PartnerId> {
        self.partners
            .values()
            .filter(|p| p.fiscal_code.as_deref() == Some(fiscal_code))
            .map(|p| p.id)
            .collect()
    }

    fn search_partners_by_rea_code(&self, rea_code: &str, except: PartnerId) -> Vec<PartnerId> {
        self.partners
            .values()
            .filter(|p| p.rea_code.as_deref() == Some(rea_code) && p.id != except)
            .map(|p| p.id)
            .collect()
    }

    fn partner(&self, id: PartnerId) -> Option<Partner> {
        self.partners.get(&id.0).cloned()
    }

    fn create_partner(&mut self, mut partner: Partner) -> PartnerId {
        let id = PartnerId(self.bump());
        partner.id = id;
        self.partners.insert(id.0, partner);
        id
    }

    fn write_partner(&mut self, partner: Partner) {
        self.partners.insert(partner.id.0, partner);
    }

    fn taxes(&self, tax_use: TaxUse) -> Vec<TaxRecord> {
        let mut taxes: Vec<TaxRecord> = self
            .taxes
            .values()
            .filter(|t| t.tax_use == tax_use)
            .cloned()
            .collect();
        taxes.sort_by_key(|t| (t.priority, t.id));
        taxes
    }

    fn tax(&self, id: TaxId) -> Option<TaxRecord> {
        self.taxes.get(&id.0).cloned()
    }

    fn withholding_taxes(&self) -> Vec<WithholdingTax> {
        self.withholding_taxes.values().cloned().collect()
    }

    fn withholding_tax(&self, id: WithholdingTaxId) -> Option<WithholdingTax> {
        self.withholding_taxes.get(&id.0).cloned()
    }

    fn supplier_products(&self, partner: PartnerId, code: &str) -> Vec<ProductId> {
        self.supplier_codes
            .iter()
            .filter(|(p, c, _)| *p == partner && c == code)
            .map(|(_, _, product)| *product)
            .collect()
    }

    fn products_by_code(&self, code: &str) -> Vec<ProductId> {
        self.product_codes
            .iter()
            .filter(|(c, _)| c == code)
            .map(|(_, product)| *product)
            .collect()
    }

    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id.0).cloned()
    }

    fn account(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id.0).cloned()
    }

    fn bank_by_bic(&self, bic: &str) -> Option<Bank> {
        self.banks.values().find(|b| b.bic == bic).cloned()
    }

    fn create_bank(&mut self, name: &str, bic: &str) -> BankId {
        let id = BankId(self.bump());
        self.banks.insert(
            id.0,
            Bank {
                id,
                name: name.to_string(),
                bic: bic.to_string(),
            },
        );
        id
    }

    fn partner_bank_by_iban(&self, partner: PartnerId, iban: &str) -> Option<PartnerBankId> {
        self.partner_banks
            .values()
            .find(|b| b.partner == partner && b.iban == iban)
            .map(|b| b.id)
    }

    fn create_partner_bank(&mut self, mut bank: PartnerBank) -> PartnerBankId {
        let id = PartnerBankId(self.bump());
        bank.id = id;
        self.partner_banks.insert(id.0, bank);
        id
    }

    fn payment_term_by_fiscal_code(&self, code: &str) -> Option<PaymentTermId> {
        self.payment_terms
            .values()
            .find(|t| t.fiscal_code.as_deref() == Some(code))
            .map(|t| t.id)
    }

    fn payment_term(&self, id: PaymentTermId) -> Option<PaymentTerm> {
        self.payment_terms.get(&id.0).cloned()
    }

    fn payment_method_by_code(&self, code: &str) -> Option<PaymentMethodId> {
        self.payment_methods
            .values()
            .find(|m| m.code == code)
            .map(|m| m.id)
    }

    fn payment_method(&self, id: PaymentMethodId) -> Option<PaymentMethod> {
        self.payment_methods.get(&id.0).cloned()
    }

    fn create_invoice(&mut self, mut invoice: Invoice) -> InvoiceId {
        let id = InvoiceId(self.bump());
        invoice.id = id;
        self.invoices.insert(id.0, invoice);
        id
    }

    fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.get(&id.0).cloned()
    }

    fn write_invoice(&mut self, invoice: Invoice) {
        self.invoices.insert(invoice.id.0, invoice);
    }

    fn file_processed(&self, name: &str) -> bool {
        self.processed_files.contains(name)
    }

    fn mark_file_processed(&mut self, name: &str) {
        self.processed_files.insert(name.to_string());
    }

    fn export_name_exists(&self, transmission_id: &str) -> bool {
        self.export_names.contains(transmission_id)
    }

    fn record_export_name(&mut self, transmission_id: &str) {
        self.export_names.insert(transmission_id.to_string());
    }
}
