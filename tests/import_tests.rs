#![cfg(feature = "import")]

use fatturapa::core::{DetailLevel, Direction, FatturaError, LineKind};
use fatturapa::import::{import_document, ImportContext, ImportDirection};
use fatturapa::ledger::Ledger;
use fatturapa::schema;
use rust_decimal_macros::dec;

mod common;

fn import_with_level(xml: &str, level: DetailLevel) -> (common::Fixture, fatturapa::core::Invoice) {
    let mut fx = common::fixture();
    let doc = schema::parse(xml).unwrap();
    let context = ImportContext {
        file_name: Some("IT02780790107_00001.xml".into()),
        detail_level: Some(level),
        ..Default::default()
    };
    let outcome = import_document(&mut fx.ledger, &fx.tables, &fx.config, &doc, &context).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    assert_eq!(outcome.invoices.len(), 1);
    let invoice = fx.ledger.invoice(outcome.invoices[0]).unwrap();
    (fx, invoice)
}

// ---------------------------------------------------------------------------
// Detail levels
// ---------------------------------------------------------------------------

#[test]
fn minimal_detail_creates_no_lines_but_keeps_source_lines() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::Minimal);
    assert!(invoice.lines.is_empty());
    assert_eq!(invoice.source_lines.len(), 2);
    assert_eq!(invoice.summaries.len(), 1);
    // ancillary blocks are processed regardless of detail level
    assert_eq!(invoice.payments.len(), 1);
    assert_eq!(invoice.related_documents.len(), 1);
}

#[test]
fn per_rate_detail_creates_one_line_per_summary_block() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerRate);
    assert_eq!(invoice.lines.len(), 1);
    let line = &invoice.lines[0];
    assert_eq!(line.kind, LineKind::Summary);
    assert_eq!(line.price_unit, dec!(230.00));
    assert_eq!(line.tax_rate, dec!(22.00));
    assert!(line.name.contains("Riepilogo Aliquota"));
}

#[test]
fn per_line_detail_creates_one_line_per_detail_line() {
    let (fx, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(invoice.lines[0].sequence, 1);
    assert_eq!(invoice.lines[1].sequence, 2);
    assert_eq!(invoice.lines[0].tax, Some(fx.purchase_tax_22));
}

// ---------------------------------------------------------------------------
// Line mapping
// ---------------------------------------------------------------------------

#[test]
fn discount_is_back_derived_from_declared_total() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    assert_eq!(invoice.lines[0].discount, Some(dec!(10.00)));
    assert_eq!(invoice.lines[0].net_amount(), dec!(180.0000));
}

#[test]
fn absent_quantity_defaults_to_one_unit() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    assert_eq!(invoice.lines[1].quantity, dec!(1));
    // the verbatim copy keeps the distinction
    assert_eq!(invoice.source_lines[1].quantity, None);
}

#[test]
fn declared_zero_quantity_is_preserved() {
    let xml = common::invoice_xml().replace(
        "<Quantita>2.00</Quantita>",
        "<Quantita>0.00</Quantita>",
    );
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    let invoice = fx.ledger.invoice(outcome.invoices[0]).unwrap();
    assert_eq!(invoice.lines[0].quantity, dec!(0.00));
    assert_eq!(invoice.source_lines[0].quantity, Some(dec!(0.00)));
}

#[test]
fn totals_are_computed_from_lines() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    let totals = invoice.totals.as_ref().unwrap();
    assert_eq!(totals.amount_untaxed, dec!(230.0000));
    assert_eq!(totals.amount_tax, dec!(50.60));
    assert_eq!(totals.amount_total, dec!(280.6000));
    // matching declared figures leave no advisory
    assert!(invoice.inconsistencies.is_empty(), "{}", invoice.inconsistencies);
}

// ---------------------------------------------------------------------------
// Cross-references (join by line sequence, not position)
// ---------------------------------------------------------------------------

#[test]
fn related_documents_resolve_by_line_sequence() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    let related = &invoice.related_documents[0];
    assert_eq!(related.name, "FC100");
    assert_eq!(related.line_ref, Some(2));
    assert_eq!(related.linked_line, Some(2));

    let ddt = &invoice.transport_documents[0];
    assert_eq!(ddt.name, "DDT55");
    assert_eq!(ddt.linked_line, Some(1));
}

#[test]
fn dangling_line_references_stay_unlinked() {
    let xml = common::invoice_xml().replace(
        "<RiferimentoNumeroLinea>2</RiferimentoNumeroLinea>\n        <IdDocumento>FC100</IdDocumento>",
        "<RiferimentoNumeroLinea>9</RiferimentoNumeroLinea>\n        <IdDocumento>FC100</IdDocumento>",
    );
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    let invoice = fx.ledger.invoice(outcome.invoices[0]).unwrap();
    assert_eq!(invoice.related_documents[0].line_ref, Some(9));
    assert_eq!(invoice.related_documents[0].linked_line, None);
}

// ---------------------------------------------------------------------------
// Withholding and welfare funds
// ---------------------------------------------------------------------------

#[test]
fn withholding_resolves_against_configured_taxes() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::withholding_body("77"),
    );
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert_eq!(invoice.withholdings.len(), 1);
    assert_eq!(invoice.withholdings[0].amount, dec!(40.00));
    assert_eq!(invoice.withholdings[0].reason, "A");
    // the subjected line carries the resolved withholding tax
    assert_eq!(invoice.lines[0].withholdings.len(), 1);
}

#[test]
fn unknown_withholding_combination_is_fatal_for_the_body() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::withholding_body("77"),
    )
    .replace("<AliquotaRitenuta>20.00</AliquotaRitenuta>", "<AliquotaRitenuta>23.00</AliquotaRitenuta>");
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    assert!(outcome.invoices.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(outcome.failures[0].error, FatturaError::Document(_)));
}

#[test]
fn welfare_fund_lines_only_at_per_line_detail() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::withholding_body("77"),
    );

    let (_, per_line) = import_with_level(&xml, DetailLevel::PerLine);
    // TC02 becomes a ledger line, TC07 never does
    let welfare_lines: Vec<_> = per_line
        .lines
        .iter()
        .filter(|l| l.kind == LineKind::WelfareFund)
        .collect();
    assert_eq!(welfare_lines.len(), 1);
    assert_eq!(welfare_lines[0].price_unit, dec!(8.00));
    // both blocks are recorded regardless
    assert_eq!(per_line.welfare_funds.len(), 2);

    let (_, per_rate) = import_with_level(&xml, DetailLevel::PerRate);
    assert!(per_rate.lines.iter().all(|l| l.kind != LineKind::WelfareFund));
    assert_eq!(per_rate.welfare_funds.len(), 2);
}

// ---------------------------------------------------------------------------
// Rounding and global discount
// ---------------------------------------------------------------------------

#[test]
fn rounding_lines_are_appended_last() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::rounding_body("88"),
    );
    let (fx, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert_eq!(invoice.lines.len(), 2);
    let rounding = &invoice.lines[1];
    assert_eq!(rounding.kind, LineKind::Rounding);
    assert_eq!(rounding.sequence, 2);
    assert_eq!(rounding.price_unit, dec!(-0.01));
    assert_eq!(rounding.name, "Rounding up");
    assert_eq!(rounding.account, fx.config.rounding_gain_account);
}

#[test]
fn rounding_without_configured_accounts_is_fatal() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::rounding_body("88"),
    );
    let mut fx = common::fixture();
    fx.config.rounding_gain_account = None;
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        FatturaError::MissingConfiguration(_)
    ));
}

#[test]
fn global_discount_becomes_a_synthetic_line() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::global_discount_body("99", "270.60"),
    );
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    let discount_line = invoice
        .lines
        .iter()
        .find(|l| l.kind == LineKind::GlobalDiscount)
        .expect("synthetic discount line");
    assert_eq!(discount_line.price_unit, dec!(-10.00));
    assert_eq!(discount_line.sequence, invoice.max_line_sequence());
    // declared total accounts for the discount, so no advisory
    assert!(invoice.inconsistencies.is_empty(), "{}", invoice.inconsistencies);
}

// ---------------------------------------------------------------------------
// Consistency checking (2-decimal tolerance)
// ---------------------------------------------------------------------------

#[test]
fn total_mismatch_beyond_tolerance_is_advisory() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::global_discount_body("99", "270.62"),
    );
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert!(invoice.inconsistencies.contains("different from document total amount"));
}

#[test]
fn sub_cent_total_mismatch_is_tolerated() {
    let xml = common::doc_xml(
        common::SUPPLIER_VAT_CODE,
        common::COMPANY_VAT_CODE,
        &common::global_discount_body("99", "270.604"),
    );
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert!(!invoice.inconsistencies.contains("different from document total"));
}

#[test]
fn unconfigured_tax_rate_is_advisory_not_fatal() {
    let xml = common::invoice_xml().replace("22.00</AliquotaIVA>", "21.00</AliquotaIVA>");
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert!(invoice.lines.iter().all(|l| l.tax.is_none()));
    assert!(invoice.inconsistencies.contains("does not exist in your system"));
}

// ---------------------------------------------------------------------------
// Header fields, payments, failure isolation
// ---------------------------------------------------------------------------

#[test]
fn header_fields_are_mapped() {
    let (fx, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    assert_eq!(invoice.direction, Direction::InInvoice);
    assert_eq!(invoice.document_type, "TD01");
    assert_eq!(invoice.number, "123");
    assert_eq!(invoice.currency, "EUR");
    assert_eq!(invoice.comment, "Fornitura periodica");
    assert_eq!(invoice.payment_reference.as_deref(), Some("123"));
    assert_eq!(invoice.source_file.as_deref(), Some("IT02780790107_00001.xml"));

    // supplier was created with normalized VAT and refreshed address
    let supplier = fx.ledger.partner(invoice.partner).unwrap();
    assert_eq!(supplier.vat.as_deref(), Some("IT02780790107"));
    assert_eq!(supplier.city.as_deref(), Some("SASSARI"));
    assert_eq!(supplier.province.as_deref(), Some("SS"));
    assert_eq!(supplier.fiscal_regime.as_deref(), Some("RF01"));
}

#[test]
fn credit_note_flips_to_refund_direction() {
    let xml = common::invoice_xml().replace("TD01", "TD04");
    let (_, invoice) = import_with_level(&xml, DetailLevel::PerLine);
    assert_eq!(invoice.direction, Direction::InRefund);
}

#[test]
fn unknown_document_type_fails_the_body() {
    let xml = common::invoice_xml().replace("TD01", "TD99");
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        FatturaError::UnknownCode { table: "document type", .. }
    ));
}

#[test]
fn due_date_falls_back_to_latest_declared_payment_date() {
    let (_, invoice) = import_with_level(&common::invoice_xml(), DetailLevel::PerLine);
    assert_eq!(
        invoice.due_date,
        Some(chrono::NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
    );
}

#[test]
fn unknown_payment_term_code_fails_the_body() {
    let xml = common::invoice_xml().replace("TP02", "TP09");
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        FatturaError::UnknownCode { table: "payment term", .. }
    ));
}

#[test]
fn body_failures_do_not_roll_back_earlier_bodies() {
    let bodies = format!(
        "{}\n{}",
        common::standard_body("1"),
        common::standard_body("2").replace("TD01", "TD99")
    );
    let xml = common::doc_xml(common::SUPPLIER_VAT_CODE, common::COMPANY_VAT_CODE, &bodies);
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let outcome = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    assert_eq!(outcome.invoices.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].body_index, 1);
    let kept = fx.ledger.invoice(outcome.invoices[0]).unwrap();
    assert_eq!(kept.number, "1");
}

#[test]
fn importing_twice_reuses_the_same_partner() {
    let mut fx = common::fixture();
    let doc = schema::parse(&common::invoice_xml()).unwrap();
    let first = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    let second = import_document(
        &mut fx.ledger,
        &fx.tables,
        &fx.config,
        &doc,
        &ImportContext::default(),
    )
    .unwrap();
    let a = fx.ledger.invoice(first.invoices[0]).unwrap();
    let b = fx.ledger.invoice(second.invoices[0]).unwrap();
    assert_eq!(a.partner, b.partner);
}

#[test]
fn outbound_import_downgrades_withholding_to_advisory() {
    let xml = common::doc_xml(
        common::COMPANY_VAT_CODE,
        common::SUPPLIER_VAT_CODE,
        &common::withholding_body("55"),
    );
    let mut fx = common::fixture();
    let doc = schema::parse(&xml).unwrap();
    let context = ImportContext {
        direction: ImportDirection::Outbound,
        ..Default::default()
    };
    let outcome = import_document(&mut fx.ledger, &fx.tables, &fx.config, &doc, &context).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    let invoice = fx.ledger.invoice(outcome.invoices[0]).unwrap();
    assert_eq!(invoice.direction, Direction::OutInvoice);
    assert!(invoice.withholdings.is_empty());
    assert!(invoice.inconsistencies.contains("DatiRitenuta not handled"));
}
