#![cfg(all(feature = "import", feature = "export"))]

use fatturapa::batch::{import_batch, import_file, BatchOptions};
use fatturapa::core::{Direction, FatturaError};
use fatturapa::export::{export_invoices, ExportOptions, TransmissionIds};
use fatturapa::import::ImportDirection;
use fatturapa::ledger::Ledger;
use fatturapa::schema;
use rust_decimal_macros::dec;

mod common;

fn named(name: &str, xml: String) -> (String, Vec<u8>) {
    (name.to_string(), xml.into_bytes())
}

// ---------------------------------------------------------------------------
// End-to-end batch scenario
// ---------------------------------------------------------------------------

#[test]
fn batch_classifies_self_issued_files_as_outbound() {
    let mut fx = common::fixture();

    // Two vendor bills; the second declares a tax rate nobody configured.
    let inbound_ok = common::invoice_xml();
    let inbound_odd = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::standard_body("124"),
    )
    .replace("22.00</AliquotaIVA>", "21.00</AliquotaIVA>");
    // Our own document: supplier VAT is the importing company's VAT.
    let self_issued = common::doc_xml(
        common::COMPANY_VAT_CODE,
        "00000000018",
        &common::standard_body("200"),
    );

    let outcome = import_batch(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        vec![
            named("IT02780790107_00001.xml", inbound_ok),
            named("IT02780790107_00002.xml", inbound_odd),
            named("IT09876543210_aB3x9.xml", self_issued),
        ],
        &BatchOptions::default(),
    );

    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(outcome.files.len(), 3);
    assert_eq!(outcome.files[0].classification, ImportDirection::Inbound);
    assert_eq!(outcome.files[1].classification, ImportDirection::Inbound);
    assert_eq!(outcome.files[2].classification, ImportDirection::Outbound);

    // The self-issued file produced an outbound invoice, not a vendor bill.
    let outbound = fx.ledger.invoice(outcome.files[2].invoices[0]).unwrap();
    assert_eq!(outbound.direction, Direction::OutInvoice);

    // No duplicate inbound record exists for our own VAT: exactly three
    // invoices total, one of them outbound.
    assert_eq!(outcome.created_invoices().count(), 3);

    // The mismatching file accumulated a tax advisory.
    let odd = fx.ledger.invoice(outcome.files[1].invoices[0]).unwrap();
    assert!(odd.inconsistencies.contains("does not exist in your system"));
    let ok = fx.ledger.invoice(outcome.files[0].invoices[0]).unwrap();
    assert!(ok.inconsistencies.is_empty(), "{}", ok.inconsistencies);
}

#[test]
fn reimporting_a_processed_file_name_is_fatal() {
    let mut fx = common::fixture();
    let first = import_file(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        "IT02780790107_00001.xml",
        common::invoice_xml().as_bytes(),
        &BatchOptions::default(),
    );
    assert!(first.is_ok());

    let second = import_file(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        "IT02780790107_00001.xml",
        common::invoice_xml().as_bytes(),
        &BatchOptions::default(),
    );
    assert!(matches!(second, Err(FatturaError::DuplicateFile(_))));
}

#[test]
fn unparseable_files_do_not_poison_the_batch() {
    let mut fx = common::fixture();
    let outcome = import_batch(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        vec![
            named("broken.xml", "<not-a-fattura/>".to_string()),
            named("good.xml", common::invoice_xml()),
        ],
        &BatchOptions::default(),
    );
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].0, "broken.xml");
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].file_name, "good.xml");
}

// ---------------------------------------------------------------------------
// Import → export round trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_line_numbering_and_amounts() {
    let mut fx = common::fixture();
    let file = import_file(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        "IT02780790107_00001.xml",
        common::invoice_xml().as_bytes(),
        &BatchOptions::default(),
    )
    .unwrap();

    // Outbound transmission needs fiscal payment codes on the invoice.
    let mut invoice = fx.ledger.invoice(file.invoices[0]).unwrap();
    invoice.payment_term = Some(fx.payment_term);
    fx.ledger.write_invoice(invoice);

    let mut ids = TransmissionIds::seeded(11);
    let files = export_invoices(
        &mut fx.ledger,
        &fx.config,
        &file.invoices,
        &ExportOptions::default(),
        &mut ids,
    )
    .unwrap();
    let reparsed = schema::parse(&files[0].xml).unwrap();
    let body = &reparsed.bodies[0];

    let lines = &body.dati_beni_servizi.dettaglio_linee;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].numero_linea, Some(1));
    assert_eq!(lines[1].numero_linea, Some(2));
    assert_eq!(lines[0].aliquota_iva, Some(dec!(22.00)));
    assert_eq!(lines[0].prezzo_totale, Some(dec!(180.00)));

    // stored summary blocks round-trip as declared
    let summary = &body.dati_beni_servizi.dati_riepilogo[0];
    assert_eq!(summary.imponibile_importo, Some(dec!(230.00)));
    assert_eq!(summary.imposta, Some(dec!(50.60)));

    assert_eq!(
        body.dati_generali.dati_generali_documento.numero.as_deref(),
        Some("123")
    );
    // original payment block round-trips with its fiscal codes
    assert_eq!(
        body.dati_pagamento[0].condizioni_pagamento.as_deref(),
        Some("TP02")
    );
}
