//! Shared fixtures: a configured in-memory ledger and FatturaPA sample
//! documents.

#![allow(dead_code)]

use fatturapa::core::{DetailLevel, PaymentTermId, TaxUse, WithholdingKind, WithholdingTaxId, TaxId};
use fatturapa::ledger::{
    Account, CodeTables, CompanyConfig, MemoryLedger, PaymentMethod, PaymentTerm, TaxRecord,
    WithholdingTax,
};
use rust_decimal_macros::dec;

pub const COMPANY_VAT_CODE: &str = "09876543210";
pub const SUPPLIER_VAT_CODE: &str = "02780790107";

pub struct Fixture {
    pub ledger: MemoryLedger,
    pub tables: CodeTables,
    pub config: CompanyConfig,
    pub purchase_tax_22: TaxId,
    pub sale_tax_22: TaxId,
    pub payment_term: PaymentTermId,
}

/// A company with purchase/sale journals, a 22%/10%/0%-N4 tax chart, one
/// withholding tax and TP02/MP05 payment codes.
pub fn fixture() -> Fixture {
    let mut ledger = MemoryLedger::new();

    let purchase_account = ledger.insert_account(Account {
        name: "Merci c/acquisti".into(),
        ..Default::default()
    });
    let sale_account = ledger.insert_account(Account {
        name: "Merci c/vendite".into(),
        ..Default::default()
    });
    let rounding_gain = ledger.insert_account(Account {
        name: "Arrotondamenti attivi".into(),
        ..Default::default()
    });
    let rounding_loss = ledger.insert_account(Account {
        name: "Arrotondamenti passivi".into(),
        ..Default::default()
    });

    let purchase_tax_22 = ledger.insert_tax(TaxRecord {
        id: TaxId(0),
        description: "IVA 22% acquisti".into(),
        tax_use: TaxUse::Purchase,
        rate: dec!(22),
        price_include: false,
        nature: None,
        has_children: false,
        priority: 1,
    });
    let sale_tax_22 = ledger.insert_tax(TaxRecord {
        id: TaxId(0),
        description: "IVA 22% vendite".into(),
        tax_use: TaxUse::Sale,
        rate: dec!(22),
        price_include: false,
        nature: None,
        has_children: false,
        priority: 1,
    });
    ledger.insert_tax(TaxRecord {
        id: TaxId(0),
        description: "IVA 10% acquisti".into(),
        tax_use: TaxUse::Purchase,
        rate: dec!(10),
        price_include: false,
        nature: None,
        has_children: false,
        priority: 2,
    });
    ledger.insert_tax(TaxRecord {
        id: TaxId(0),
        description: "Esente art.10".into(),
        tax_use: TaxUse::Purchase,
        rate: dec!(0),
        price_include: false,
        nature: Some("N4".into()),
        has_children: false,
        priority: 3,
    });

    ledger.insert_withholding_tax(WithholdingTax {
        id: WithholdingTaxId(0),
        description: "Ritenuta 20% professionisti".into(),
        rate: dec!(20),
        kind: WithholdingKind::Withholding,
        reason: "A".into(),
    });

    let mp05 = ledger.insert_payment_method(PaymentMethod {
        id: Default::default(),
        name: "Bonifico".into(),
        code: "MP05".into(),
    });
    let payment_term = ledger.insert_payment_term(PaymentTerm {
        id: Default::default(),
        name: "30 giorni data fattura".into(),
        fiscal_code: Some("TP02".into()),
        fiscal_method: Some(mp05),
    });

    let mut config = CompanyConfig::new("Importing SPA", "IT", COMPANY_VAT_CODE);
    config.fiscal_code = Some(COMPANY_VAT_CODE.into());
    config.street = Some("VIA TORINO 38-B".into());
    config.zip = Some("00145".into());
    config.city = Some("ROMA".into());
    config.province = Some("RM".into());
    config.transmitter_code = COMPANY_VAT_CODE.into();
    config.purchase_account = Some(purchase_account);
    config.sale_account = Some(sale_account);
    config.rounding_gain_account = Some(rounding_gain);
    config.rounding_loss_account = Some(rounding_loss);
    config.rounding_tax = Some(purchase_tax_22);
    config.detail_level = DetailLevel::PerLine;

    Fixture {
        ledger,
        tables: CodeTables::italian_defaults(),
        config,
        purchase_tax_22,
        sale_tax_22,
        payment_term,
    }
}

// ---------------------------------------------------------------------------
// Sample documents
// ---------------------------------------------------------------------------

pub fn doc_xml(supplier_vat_code: &str, buyer_vat_code: &str, bodies: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<p:FatturaElettronica versione="FPR12" xmlns:p="http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2">
  <FatturaElettronicaHeader>
    <DatiTrasmissione>
      <IdTrasmittente><IdPaese>IT</IdPaese><IdCodice>{supplier_vat_code}</IdCodice></IdTrasmittente>
      <ProgressivoInvio>00001</ProgressivoInvio>
      <FormatoTrasmissione>FPR12</FormatoTrasmissione>
      <CodiceDestinatario>0000000</CodiceDestinatario>
    </DatiTrasmissione>
    <CedentePrestatore>
      <DatiAnagrafici>
        <IdFiscaleIVA><IdPaese>IT</IdPaese><IdCodice>{supplier_vat_code}</IdCodice></IdFiscaleIVA>
        <CodiceFiscale>{supplier_vat_code}</CodiceFiscale>
        <Anagrafica><Denominazione>ALPHA SRL</Denominazione></Anagrafica>
        <RegimeFiscale>RF01</RegimeFiscale>
      </DatiAnagrafici>
      <Sede>
        <Indirizzo>VIALE ROMA 543</Indirizzo>
        <CAP>07100</CAP>
        <Comune>SASSARI</Comune>
        <Provincia>SS</Provincia>
        <Nazione>IT</Nazione>
      </Sede>
    </CedentePrestatore>
    <CessionarioCommittente>
      <DatiAnagrafici>
        <IdFiscaleIVA><IdPaese>IT</IdPaese><IdCodice>{buyer_vat_code}</IdCodice></IdFiscaleIVA>
        <Anagrafica><Denominazione>Importing SPA</Denominazione></Anagrafica>
      </DatiAnagrafici>
      <Sede>
        <Indirizzo>VIA TORINO 38-B</Indirizzo>
        <CAP>00145</CAP>
        <Comune>ROMA</Comune>
        <Provincia>RM</Provincia>
        <Nazione>IT</Nazione>
      </Sede>
    </CessionarioCommittente>
  </FatturaElettronicaHeader>
{bodies}
</p:FatturaElettronica>
"#
    )
}

/// Two detail lines (one with a declared total discount, one without a
/// quantity), one summary block, one TP02/MP05 payment, a linked invoice
/// reference to line 2 and a transport document for line 1.
pub fn standard_body(number: &str) -> String {
    format!(
        r#"  <FatturaElettronicaBody>
    <DatiGenerali>
      <DatiGeneraliDocumento>
        <TipoDocumento>TD01</TipoDocumento>
        <Divisa>EUR</Divisa>
        <Data>2024-06-15</Data>
        <Numero>{number}</Numero>
        <Causale>Fornitura periodica</Causale>
      </DatiGeneraliDocumento>
      <DatiFattureCollegate>
        <RiferimentoNumeroLinea>2</RiferimentoNumeroLinea>
        <IdDocumento>FC100</IdDocumento>
        <Data>2024-05-31</Data>
      </DatiFattureCollegate>
      <DatiDDT>
        <NumeroDDT>DDT55</NumeroDDT>
        <DataDDT>2024-06-10</DataDDT>
        <RiferimentoNumeroLinea>1</RiferimentoNumeroLinea>
      </DatiDDT>
    </DatiGenerali>
    <DatiBeniServizi>
      <DettaglioLinee>
        <NumeroLinea>1</NumeroLinea>
        <Descrizione>Tempo e materiali</Descrizione>
        <Quantita>2.00</Quantita>
        <PrezzoUnitario>100.00</PrezzoUnitario>
        <ScontoMaggiorazione><Tipo>SC</Tipo><Percentuale>10.00</Percentuale></ScontoMaggiorazione>
        <PrezzoTotale>180.00</PrezzoTotale>
        <AliquotaIVA>22.00</AliquotaIVA>
      </DettaglioLinee>
      <DettaglioLinee>
        <NumeroLinea>2</NumeroLinea>
        <Descrizione>Canone mensile</Descrizione>
        <PrezzoUnitario>50.00</PrezzoUnitario>
        <PrezzoTotale>50.00</PrezzoTotale>
        <AliquotaIVA>22.00</AliquotaIVA>
      </DettaglioLinee>
      <DatiRiepilogo>
        <AliquotaIVA>22.00</AliquotaIVA>
        <ImponibileImporto>230.00</ImponibileImporto>
        <Imposta>50.60</Imposta>
        <EsigibilitaIVA>I</EsigibilitaIVA>
      </DatiRiepilogo>
    </DatiBeniServizi>
    <DatiPagamento>
      <CondizioniPagamento>TP02</CondizioniPagamento>
      <DettaglioPagamento>
        <ModalitaPagamento>MP05</ModalitaPagamento>
        <DataScadenzaPagamento>2024-07-15</DataScadenzaPagamento>
        <ImportoPagamento>280.60</ImportoPagamento>
      </DettaglioPagamento>
    </DatiPagamento>
  </FatturaElettronicaBody>"#
    )
}

pub fn invoice_xml() -> String {
    doc_xml(SUPPLIER_VAT_CODE, COMPANY_VAT_CODE, &standard_body("123"))
}

/// Withholding (RT01/A/20%) with a subjected line, plus two welfare-fund
/// blocks (TC02 and the TC07 that never becomes a ledger line).
pub fn withholding_body(number: &str) -> String {
    format!(
        r#"  <FatturaElettronicaBody>
    <DatiGenerali>
      <DatiGeneraliDocumento>
        <TipoDocumento>TD06</TipoDocumento>
        <Divisa>EUR</Divisa>
        <Data>2024-06-15</Data>
        <Numero>{number}</Numero>
        <DatiRitenuta>
          <TipoRitenuta>RT01</TipoRitenuta>
          <ImportoRitenuta>40.00</ImportoRitenuta>
          <AliquotaRitenuta>20.00</AliquotaRitenuta>
          <CausalePagamento>A</CausalePagamento>
        </DatiRitenuta>
        <DatiCassaPrevidenziale>
          <TipoCassa>TC02</TipoCassa>
          <AlCassa>4.00</AlCassa>
          <ImportoContributoCassa>8.00</ImportoContributoCassa>
          <ImponibileCassa>200.00</ImponibileCassa>
          <AliquotaIVA>22.00</AliquotaIVA>
          <Ritenuta>SI</Ritenuta>
        </DatiCassaPrevidenziale>
        <DatiCassaPrevidenziale>
          <TipoCassa>TC07</TipoCassa>
          <ImportoContributoCassa>5.00</ImportoContributoCassa>
          <AliquotaIVA>22.00</AliquotaIVA>
        </DatiCassaPrevidenziale>
      </DatiGeneraliDocumento>
    </DatiGenerali>
    <DatiBeniServizi>
      <DettaglioLinee>
        <NumeroLinea>1</NumeroLinea>
        <Descrizione>Prestazione professionale</Descrizione>
        <PrezzoUnitario>200.00</PrezzoUnitario>
        <PrezzoTotale>200.00</PrezzoTotale>
        <AliquotaIVA>22.00</AliquotaIVA>
        <Ritenuta>SI</Ritenuta>
      </DettaglioLinee>
      <DatiRiepilogo>
        <AliquotaIVA>22.00</AliquotaIVA>
        <ImponibileImporto>208.00</ImponibileImporto>
        <Imposta>45.76</Imposta>
      </DatiRiepilogo>
    </DatiBeniServizi>
  </FatturaElettronicaBody>"#
    )
}

/// A summary block declaring a negative rounding adjustment.
pub fn rounding_body(number: &str) -> String {
    format!(
        r#"  <FatturaElettronicaBody>
    <DatiGenerali>
      <DatiGeneraliDocumento>
        <TipoDocumento>TD01</TipoDocumento>
        <Divisa>EUR</Divisa>
        <Data>2024-06-15</Data>
        <Numero>{number}</Numero>
      </DatiGeneraliDocumento>
    </DatiGenerali>
    <DatiBeniServizi>
      <DettaglioLinee>
        <NumeroLinea>1</NumeroLinea>
        <Descrizione>Servizio</Descrizione>
        <Quantita>1.00</Quantita>
        <PrezzoUnitario>100.00</PrezzoUnitario>
        <PrezzoTotale>100.00</PrezzoTotale>
        <AliquotaIVA>22.00</AliquotaIVA>
      </DettaglioLinee>
      <DatiRiepilogo>
        <AliquotaIVA>22.00</AliquotaIVA>
        <Arrotondamento>-0.01</Arrotondamento>
        <ImponibileImporto>100.00</ImponibileImporto>
        <Imposta>22.00</Imposta>
      </DatiRiepilogo>
    </DatiBeniServizi>
  </FatturaElettronicaBody>"#
    )
}

/// Document-level discount with a declared grand total.
pub fn global_discount_body(number: &str, declared_total: &str) -> String {
    format!(
        r#"  <FatturaElettronicaBody>
    <DatiGenerali>
      <DatiGeneraliDocumento>
        <TipoDocumento>TD01</TipoDocumento>
        <Divisa>EUR</Divisa>
        <Data>2024-06-15</Data>
        <Numero>{number}</Numero>
        <ScontoMaggiorazione><Tipo>SC</Tipo><Importo>10.00</Importo></ScontoMaggiorazione>
        <ImportoTotaleDocumento>{declared_total}</ImportoTotaleDocumento>
      </DatiGeneraliDocumento>
    </DatiGenerali>
    <DatiBeniServizi>
      <DettaglioLinee>
        <NumeroLinea>1</NumeroLinea>
        <Descrizione>Materiale</Descrizione>
        <Quantita>1.00</Quantita>
        <PrezzoUnitario>230.00</PrezzoUnitario>
        <PrezzoTotale>230.00</PrezzoTotale>
        <AliquotaIVA>22.00</AliquotaIVA>
      </DettaglioLinee>
      <DatiRiepilogo>
        <AliquotaIVA>22.00</AliquotaIVA>
        <ImponibileImporto>230.00</ImponibileImporto>
        <Imposta>50.60</Imposta>
      </DatiRiepilogo>
    </DatiBeniServizi>
  </FatturaElettronicaBody>"#
    )
}
