use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
            Deserialize,
        )]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Ledger business-partner identifier.
    PartnerId
);
id_newtype!(
    /// Ledger tax-record identifier.
    TaxId
);
id_newtype!(
    /// Ledger withholding-tax identifier.
    WithholdingTaxId
);
id_newtype!(
    /// Ledger product identifier.
    ProductId
);
id_newtype!(
    /// Ledger account identifier.
    AccountId
);
id_newtype!(
    /// Ledger invoice identifier.
    InvoiceId
);
id_newtype!(
    /// Fiscal payment-term identifier (TPxx code table).
    PaymentTermId
);
id_newtype!(
    /// Fiscal payment-method identifier (MPxx code table).
    PaymentMethodId
);
id_newtype!(
    /// Partner bank-account identifier.
    PartnerBankId
);
id_newtype!(
    /// Bank registry identifier.
    BankId
);

/// Invoice direction, including the refund sub-variants (TD04 flips a
/// document to the refund variant of its direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    InInvoice,
    InRefund,
    OutInvoice,
    OutRefund,
}

impl Direction {
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::InInvoice | Self::InRefund)
    }

    /// The refund variant of this direction.
    pub fn refund(&self) -> Self {
        match self {
            Self::InInvoice | Self::InRefund => Self::InRefund,
            Self::OutInvoice | Self::OutRefund => Self::OutRefund,
        }
    }

    /// Which side of the tax chart this direction draws from.
    pub fn tax_use(&self) -> TaxUse {
        if self.is_inbound() {
            TaxUse::Purchase
        } else {
            TaxUse::Sale
        }
    }
}

/// Which tax chart a tax record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxUse {
    Sale,
    Purchase,
}

/// Granularity of the invoice lines synthesized on import.
///
/// Controls only how many ledger lines are created; ancillary blocks
/// (payments, withholding, related documents) are processed regardless,
/// except welfare-fund ledger lines which require [`DetailLevel::PerLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetailLevel {
    /// No lines: the user creates them manually from the source lines.
    Minimal,
    /// One line per distinct (rate, nature) summary block.
    PerRate,
    /// One line per document detail line.
    #[default]
    PerLine,
}

impl DetailLevel {
    /// Wire code used by partner configuration ("0"/"1"/"2").
    pub fn code(&self) -> &'static str {
        match self {
            Self::Minimal => "0",
            Self::PerRate => "1",
            Self::PerLine => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Minimal),
            "1" => Some(Self::PerRate),
            "2" => Some(Self::PerLine),
            _ => None,
        }
    }
}

/// TipoRitenuta — withholding type codes (2.1.1.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithholdingCode {
    /// RT01 — natural persons.
    Rt01,
    /// RT02 — legal persons.
    Rt02,
    /// RT03 — INPS contribution.
    Rt03,
    /// RT04 — ENASARCO contribution.
    Rt04,
    /// RT05 — ENPAM contribution.
    Rt05,
    /// RT06 — other social security.
    Rt06,
}

impl WithholdingCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rt01 => "RT01",
            Self::Rt02 => "RT02",
            Self::Rt03 => "RT03",
            Self::Rt04 => "RT04",
            Self::Rt05 => "RT05",
            Self::Rt06 => "RT06",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RT01" => Some(Self::Rt01),
            "RT02" => Some(Self::Rt02),
            "RT03" => Some(Self::Rt03),
            "RT04" => Some(Self::Rt04),
            "RT05" => Some(Self::Rt05),
            "RT06" => Some(Self::Rt06),
            _ => None,
        }
    }

    /// Which configured withholding-tax family the code maps to.
    pub fn kind(&self) -> WithholdingKind {
        match self {
            Self::Rt01 | Self::Rt02 => WithholdingKind::Withholding,
            Self::Rt03 => WithholdingKind::Inps,
            Self::Rt04 => WithholdingKind::Enasarco,
            Self::Rt05 => WithholdingKind::Enpam,
            Self::Rt06 => WithholdingKind::Other,
        }
    }
}

/// Family of a configured withholding-tax record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithholdingKind {
    Withholding,
    Inps,
    Enasarco,
    Enpam,
    Other,
}

/// What produced a ledger line during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// One of the document's DettaglioLinee.
    Detail,
    /// Synthesized from a DatiRiepilogo block at per-rate detail.
    Summary,
    /// Rounding adjustment appended after all other lines.
    Rounding,
    /// Synthetic line for a document-level discount/surcharge.
    GlobalDiscount,
    /// Welfare-fund contribution line.
    WelfareFund,
}

/// One ledger invoice line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Line sequence; for per-line detail this equals the document's
    /// NumeroLinea and is the join key for related-document and transport
    /// back-references.
    pub sequence: u32,
    pub name: String,
    pub account: Option<AccountId>,
    pub product: Option<ProductId>,
    pub quantity: Decimal,
    pub price_unit: Decimal,
    /// Discount percentage back-derived from the declared line total.
    pub discount: Option<Decimal>,
    pub tax: Option<TaxId>,
    /// Rate snapshot so totals can be recomputed without a tax lookup.
    pub tax_rate: Decimal,
    pub tax_nature: Option<String>,
    pub admin_ref: Option<String>,
    pub withholdings: Vec<WithholdingTaxId>,
    pub kind: LineKind,
}

impl InvoiceLine {
    /// Net amount: quantity × unit price, minus the discount percentage.
    pub fn net_amount(&self) -> Decimal {
        let base = self.quantity * self.price_unit;
        match self.discount {
            Some(pct) => base * (Decimal::ONE - pct / dec!(100)),
            None => base,
        }
    }
}

/// Verbatim copy of one document detail line, kept independently of the
/// synthesized ledger lines so that minimal-detail imports still record
/// what the document declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceLine {
    pub line_number: u32,
    pub service_type: Option<String>,
    pub name: String,
    /// None when the document omitted Quantita; Some(0) when it declared
    /// an explicit zero. The distinction is preserved deliberately.
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub tax_rate: Decimal,
    pub subject_to_withholding: bool,
    pub tax_nature: Option<String>,
    pub admin_ref: Option<String>,
    pub article_codes: Vec<ArticleCode>,
    pub discounts: Vec<DiscountStep>,
    pub other_data: Vec<OtherLineData>,
}

/// CodiceArticolo — article code on a detail line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCode {
    pub kind: String,
    pub value: String,
}

/// SC (discount) / MG (surcharge) step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    Discount,
    Surcharge,
}

impl DiscountKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discount => "SC",
            Self::Surcharge => "MG",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SC" => Some(Self::Discount),
            "MG" => Some(Self::Surcharge),
            _ => None,
        }
    }
}

/// One ScontoMaggiorazione step (line-level or document-level).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountStep {
    pub kind: DiscountKind,
    pub percentage: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// AltriDatiGestionali — free management data on a detail line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherLineData {
    pub kind: String,
    pub text_ref: Option<String>,
    pub num_ref: Option<Decimal>,
    pub date_ref: Option<NaiveDate>,
}

/// One DatiRiepilogo block: the per-rate summary declared by the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSummary {
    pub tax_rate: Decimal,
    pub nature: Option<String>,
    pub incidental_charges: Option<Decimal>,
    pub rounding: Option<Decimal>,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
    /// EsigibilitaIVA: I (immediate), D (deferred), S (split payment).
    pub payability: Option<String>,
    pub law_reference: Option<String>,
}

/// One resolved DatiRitenuta block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithholdingLine {
    pub code: WithholdingCode,
    pub amount: Decimal,
    pub rate: Decimal,
    /// CausalePagamento — payment reason code.
    pub reason: String,
    pub tax: WithholdingTaxId,
}

/// One DatiCassaPrevidenziale block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareFundLine {
    /// TCxx fund-type code, resolved against the welfare-fund table.
    pub fund_type: String,
    pub rate: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub taxable: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    pub subject_to_withholding: bool,
    pub nature: Option<String>,
    pub pa_line_code: Option<String>,
}

/// Payment conditions block (DatiPagamento) with its detail rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentBlock {
    pub terms: PaymentTermId,
    pub details: Vec<PaymentDetail>,
}

/// One DettaglioPagamento row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub recipient: Option<String>,
    pub method: Option<PaymentMethodId>,
    pub term_start: Option<NaiveDate>,
    pub term_days: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub post_office_code: Option<String>,
    pub payee_surname: Option<String>,
    pub payee_name: Option<String>,
    pub payee_fiscal_code: Option<String>,
    pub payee_title: Option<String>,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub abi: Option<String>,
    pub cab: Option<String>,
    pub bic: Option<String>,
    pub partner_bank: Option<PartnerBankId>,
    pub prepayment_discount: Option<Decimal>,
    pub max_advance_date: Option<NaiveDate>,
    pub penalty_amount: Option<Decimal>,
    pub penalty_date: Option<NaiveDate>,
    pub payment_code: Option<String>,
}

/// Which related-document block a cross-reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedDocumentKind {
    /// DatiOrdineAcquisto (2.1.2).
    Order,
    /// DatiContratto (2.1.3).
    Contract,
    /// DatiConvenzione (2.1.4).
    Agreement,
    /// DatiRicezione (2.1.5).
    Reception,
    /// DatiFattureCollegate (2.1.6).
    Invoice,
}

/// Cross-reference to an external document, optionally pinned to one
/// ledger line via the declared line number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub kind: RelatedDocumentKind,
    pub name: String,
    /// Declared RiferimentoNumeroLinea, if any.
    pub line_ref: Option<u32>,
    /// Sequence of the ledger line that matched `line_ref`. None when the
    /// reference is document-level or no line with that sequence exists.
    pub linked_line: Option<u32>,
    pub date: Option<NaiveDate>,
    pub num_item: Option<String>,
    pub code: Option<String>,
    pub cig: Option<String>,
    pub cup: Option<String>,
}

/// DatiDDT — transport document reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportDocument {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub line_ref: Option<u32>,
    pub linked_line: Option<u32>,
}

/// DatiTrasporto — delivery block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryData {
    pub carrier: Option<PartnerId>,
    pub vehicle: Option<String>,
    pub reason: Option<String>,
    pub packages: Option<u32>,
    pub description: Option<String>,
    pub weight_unit: Option<String>,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
    pub pickup_datetime: Option<NaiveDateTime>,
    pub transport_date: Option<NaiveDate>,
    pub delivery_datetime: Option<NaiveDateTime>,
    /// Free-form rendering of IndirizzoResa.
    pub delivery_address: Option<String>,
    pub incoterms: Option<String>,
}

/// FatturaPrincipale — parent invoice reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainInvoiceRef {
    pub number: String,
    pub date: Option<NaiveDate>,
}

/// DatiVeicoli.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleData {
    pub registration_date: Option<NaiveDate>,
    pub total_distance: Option<String>,
}

/// DatiBollo — virtual stamp duty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampDuty {
    pub virtual_stamp: bool,
    pub amount: Option<Decimal>,
}

/// Allegati — document attachment carried verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
    pub compression: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    /// Base64 payload exactly as transmitted.
    pub data: String,
}

/// StabileOrganizzazione — supplier's permanent establishment in Italy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermanentEstablishment {
    pub street: Option<String>,
    pub number: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
}

/// Computed totals, set once by the document assembler after every block
/// has been applied. The consistency checker reads these and never writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub amount_untaxed: Decimal,
    pub amount_tax: Decimal,
    pub amount_total: Decimal,
}

/// The invoice aggregate: one per FatturaElettronicaBody on import, one
/// per ledger record on export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub direction: Direction,
    /// TDxx document-type code, validated against the document-type table.
    pub document_type: String,
    /// Document number (Numero).
    pub number: String,
    pub document_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    /// Ledger registration date, chosen per company policy.
    pub registration_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// ISO currency code (Divisa), validated against the currency table.
    pub currency: String,
    pub partner: PartnerId,
    pub payment_term: Option<PaymentTermId>,
    /// Concatenated Causale texts.
    pub comment: String,
    /// SoggettoEmittente.
    pub sender: Option<String>,
    pub art73: bool,
    /// Document-level Arrotondamento.
    pub rounding: Option<Decimal>,
    pub stamp_duty: Option<StampDuty>,
    pub payment_reference: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub source_lines: Vec<SourceLine>,
    pub summaries: Vec<TaxSummary>,
    pub withholdings: Vec<WithholdingLine>,
    pub welfare_funds: Vec<WelfareFundLine>,
    pub payments: Vec<PaymentBlock>,
    pub related_documents: Vec<RelatedDocument>,
    pub transport_documents: Vec<TransportDocument>,
    pub delivery: Option<DeliveryData>,
    /// RiferimentoFase values from DatiSAL.
    pub activity_progress: Vec<u32>,
    pub main_invoice: Option<MainInvoiceRef>,
    pub vehicle: Option<VehicleData>,
    pub attachments: Vec<AttachmentRef>,
    pub permanent_establishment: Option<PermanentEstablishment>,
    pub tax_representative: Option<PartnerId>,
    pub intermediary: Option<PartnerId>,
    /// Name of the XML file this invoice was imported from.
    pub source_file: Option<String>,
    /// Advisory log accumulated during assembly.
    pub inconsistencies: String,
    pub totals: Option<InvoiceTotals>,
}

impl Invoice {
    /// Recompute totals from the current lines: net amounts summed as-is,
    /// tax grouped by rate and rounded half-up to 2 decimals per group.
    pub fn compute_totals(&self) -> InvoiceTotals {
        let mut by_rate: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        let mut untaxed = Decimal::ZERO;
        for line in &self.lines {
            let net = line.net_amount();
            untaxed += net;
            *by_rate.entry(line.tax_rate).or_insert(Decimal::ZERO) += net;
        }
        let mut tax = Decimal::ZERO;
        for (rate, base) in &by_rate {
            tax += round_half_up(base * rate / dec!(100), 2);
        }
        InvoiceTotals {
            amount_untaxed: untaxed,
            amount_tax: tax,
            amount_total: untaxed + tax,
        }
    }

    /// Highest line sequence in use, or 0 when there are no lines.
    pub fn max_line_sequence(&self) -> u32 {
        self.lines.iter().map(|l| l.sequence).max().unwrap_or(0)
    }

    /// The ledger line with the given sequence, if any.
    pub fn line_by_sequence(&self, sequence: u32) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.sequence == sequence)
    }
}

/// Round half-up (commercial rounding), the strategy mandated for
/// statutory tax amounts.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}
