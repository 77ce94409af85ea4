//! Document assembly: one ledger invoice per FatturaElettronicaBody.
//!
//! A single linear pipeline per body section, no backtracking. A fatal
//! error in one body aborts that body only; invoices already assembled
//! from earlier bodies of the same document stay committed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use super::consistency;
use super::lines::{adjust_accounting_data, map_lines};
use super::partner::{resolve_carrier, resolve_customer, resolve_partner, resolve_supplier};
use super::tax::resolve_tax;
use crate::core::{
    AttachmentRef, DeliveryData, DetailLevel, Direction, DiscountKind, FatturaError,
    Inconsistencies, Invoice, InvoiceId, InvoiceLine, LineKind, MainInvoiceRef, PartnerId,
    PaymentBlock, PaymentDetail, PermanentEstablishment, RelatedDocument, RelatedDocumentKind,
    SourceLine, StampDuty, TaxSummary, TransportDocument, VehicleData, WelfareFundLine,
    WithholdingCode, WithholdingLine,
};
use crate::ledger::{registration_date, CodeTables, CompanyConfig, Ledger, PartnerBank};
use crate::schema::{
    DatiDocumentiCorrelati, DatiGeneraliDocumento, DettaglioLinea, FatturaElettronica,
    FatturaElettronicaBody, FatturaElettronicaHeader, Sede,
};

/// Whether the document is processed as a vendor bill or as one of the
/// company's own outbound documents (self-issued classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportDirection {
    #[default]
    Inbound,
    Outbound,
}

/// Per-call import parameters.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    /// Source file name, recorded on the invoice.
    pub file_name: Option<String>,
    /// Date the file was received, when known.
    pub received_date: Option<NaiveDate>,
    /// Overrides the partner/company detail-level configuration.
    pub detail_level: Option<DetailLevel>,
    pub direction: ImportDirection,
}

/// One body section that could not be assembled.
#[derive(Debug)]
pub struct BodyFailure {
    /// Zero-based index of the body within the document.
    pub body_index: usize,
    pub error: FatturaError,
}

/// Result of importing one document: created invoices plus per-body
/// failures (failure isolation is at body-section granularity).
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub invoices: Vec<InvoiceId>,
    pub failures: Vec<BodyFailure>,
}

/// Import every body section of a parsed document.
///
/// Header-level resolution (counterparty, tax representative,
/// intermediary) happens once; its advisories are replayed into every
/// invoice, matching how a reviewer reads the document.
pub fn import_document<L: Ledger>(
    ledger: &mut L,
    tables: &CodeTables,
    config: &CompanyConfig,
    doc: &FatturaElettronica,
    context: &ImportContext,
) -> Result<ImportOutcome, FatturaError> {
    let mut header_log = Inconsistencies::new();

    let partner_id = match context.direction {
        ImportDirection::Inbound => {
            let cedente = doc
                .header
                .cedente_prestatore
                .as_ref()
                .ok_or(FatturaError::MissingElement("CedentePrestatore"))?;
            resolve_supplier(ledger, cedente, &config.country, tables, &mut header_log)?
                .ok_or(FatturaError::MissingElement("DatiAnagrafici"))?
        }
        ImportDirection::Outbound => {
            let cessionario = doc
                .header
                .cessionario_committente
                .as_ref()
                .ok_or(FatturaError::MissingElement("CessionarioCommittente"))?;
            resolve_customer(ledger, cessionario, &config.country, tables, &mut header_log)?
                .ok_or(FatturaError::MissingElement("DatiAnagrafici"))?
        }
    };

    let (tax_representative, intermediary) = match context.direction {
        ImportDirection::Inbound => {
            let tax_rep = match &doc.header.rappresentante_fiscale {
                Some(rapp) => resolve_partner(
                    ledger,
                    rapp.dati_anagrafici.as_ref(),
                    &config.country,
                    tables,
                    &mut header_log,
                )?,
                None => None,
            };
            let intermediary = match &doc.header.terzo_intermediario {
                Some(terzo) => resolve_partner(
                    ledger,
                    terzo.dati_anagrafici.as_ref(),
                    &config.country,
                    tables,
                    &mut header_log,
                )?,
                None => None,
            };
            (tax_rep, intermediary)
        }
        ImportDirection::Outbound => (None, None),
    };

    let detail_level = match context.direction {
        // Outbound documents always carry their own lines verbatim.
        ImportDirection::Outbound => DetailLevel::PerLine,
        ImportDirection::Inbound => context
            .detail_level
            .or_else(|| {
                ledger
                    .partner(partner_id)
                    .and_then(|p| p.detail_level)
            })
            .unwrap_or(config.detail_level),
    };

    let mut outcome = ImportOutcome::default();
    for (body_index, body) in doc.bodies.iter().enumerate() {
        match assemble_body(
            ledger,
            tables,
            config,
            &doc.header,
            body,
            partner_id,
            detail_level,
            context,
            &header_log,
            tax_representative,
            intermediary,
        ) {
            Ok(id) => {
                debug!(invoice = id.0, body_index, "body section imported");
                outcome.invoices.push(id);
            }
            Err(error) => outcome.failures.push(BodyFailure { body_index, error }),
        }
    }
    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
fn assemble_body<L: Ledger>(
    ledger: &mut L,
    tables: &CodeTables,
    config: &CompanyConfig,
    header: &FatturaElettronicaHeader,
    body: &FatturaElettronicaBody,
    partner_id: PartnerId,
    detail_level: DetailLevel,
    context: &ImportContext,
    header_log: &Inconsistencies,
    tax_representative: Option<PartnerId>,
    intermediary: Option<PartnerId>,
) -> Result<InvoiceId, FatturaError> {
    let mut log = header_log.clone();
    let dgd = &body.dati_generali.dati_generali_documento;

    // 2.1.1.2 currency
    let currency = dgd
        .divisa
        .clone()
        .ok_or(FatturaError::MissingElement("Divisa"))?;
    if !tables.currencies.contains(&currency) {
        return Err(FatturaError::UnknownCode {
            table: "currency",
            code: currency,
        });
    }

    // 2.1.1.1 document type; TD04 flips to the refund variant
    let document_type = dgd
        .tipo_documento
        .clone()
        .ok_or(FatturaError::MissingElement("TipoDocumento"))?;
    if !tables.document_types.contains(&document_type) {
        return Err(FatturaError::UnknownCode {
            table: "document type",
            code: document_type,
        });
    }
    let mut direction = match context.direction {
        ImportDirection::Inbound => Direction::InInvoice,
        ImportDirection::Outbound => Direction::OutInvoice,
    };
    if document_type == "TD04" {
        direction = direction.refund();
    }
    let tax_use = direction.tax_use();
    let account = config.journal_account(tax_use)?;

    let document_date = dgd.data.ok_or(FatturaError::MissingElement("Data"))?;
    let number = dgd.numero.clone().unwrap_or_default();
    let reg_date = match context.direction {
        ImportDirection::Inbound => registration_date(
            config.registration_date_policy,
            document_date,
            context.received_date,
        ),
        ImportDirection::Outbound => document_date,
    };

    // 2.1.1.5 withholding resolution, fatal on unresolvable combinations
    let withholdings = resolve_withholdings(ledger, dgd, &number, context.direction, &mut log)?;
    let wt_ids: Vec<_> = withholdings.iter().map(|w| w.tax).collect();

    let partner = ledger.partner(partner_id).ok_or(FatturaError::Dangling {
        entity: "partner",
        id: partner_id.0,
    })?;

    // 2.2.1 ledger lines (detail level) + rounding lines
    let mut lines = map_lines(
        ledger,
        config,
        &partner,
        body,
        detail_level,
        account,
        tax_use,
        &wt_ids,
        &mut log,
    )?;

    // 2.1.1.7 welfare funds: blocks are always recorded; ledger lines only
    // at per-line detail on the purchase side, and never for TC07
    let welfare_funds = collect_welfare_funds(tables, body)?;
    if detail_level == DetailLevel::PerLine && context.direction == ImportDirection::Inbound {
        synthesize_welfare_lines(
            ledger,
            config,
            &welfare_funds,
            &wt_ids,
            account,
            tax_use,
            &mut lines,
            &mut log,
        )?;
    }

    let source_lines = body
        .dati_beni_servizi
        .dettaglio_linee
        .iter()
        .map(map_source_line)
        .collect();

    let summaries = body
        .dati_beni_servizi
        .dati_riepilogo
        .iter()
        .map(|s| TaxSummary {
            tax_rate: s.aliquota_iva.unwrap_or(Decimal::ZERO),
            nature: s.natura.clone(),
            incidental_charges: s.spese_accessorie,
            rounding: s.arrotondamento,
            taxable_amount: s.imponibile_importo.unwrap_or(Decimal::ZERO),
            tax_amount: s.imposta.unwrap_or(Decimal::ZERO),
            payability: s.esigibilita_iva.clone(),
            law_reference: s.riferimento_normativo.clone(),
        })
        .collect();

    let related_documents = map_related_documents(body, &lines);
    let transport_documents = map_transport_documents(body, &lines);
    let delivery = match &body.dati_generali.dati_trasporto {
        Some(trasporto) => Some(map_delivery(ledger, tables, config, trasporto, &mut log)?),
        None => None,
    };
    let payments = map_payments(ledger, body, partner_id, &mut log)?;

    // Partner payment term wins; otherwise the latest declared due date.
    let payment_term = partner.payment_term;
    let due_date = if payment_term.is_none() {
        payments
            .iter()
            .flat_map(|p| p.details.iter())
            .filter_map(|d| d.due_date)
            .max()
    } else {
        None
    };

    let attachments = body
        .allegati
        .iter()
        .map(|a| AttachmentRef {
            name: a.nome_attachment.clone().unwrap_or_default(),
            compression: a.algoritmo_compressione.clone(),
            format: a.formato_attachment.clone(),
            description: a.descrizione_attachment.clone(),
            data: a.attachment.clone().unwrap_or_default(),
        })
        .collect();

    let mut invoice = Invoice {
        id: InvoiceId(0),
        direction,
        document_type,
        number: number.clone(),
        document_date,
        received_date: context.received_date,
        registration_date: reg_date,
        due_date,
        currency,
        partner: partner_id,
        payment_term,
        comment: dgd.causale.join("\n"),
        sender: header.soggetto_emittente.clone(),
        art73: dgd.art73.is_some(),
        rounding: dgd.arrotondamento,
        stamp_duty: dgd.dati_bollo.as_ref().map(|b| StampDuty {
            virtual_stamp: b.bollo_virtuale.as_deref() == Some("SI"),
            amount: b.importo_bollo,
        }),
        payment_reference: dgd.numero.clone(),
        lines,
        source_lines,
        summaries,
        withholdings,
        welfare_funds,
        payments,
        related_documents,
        transport_documents,
        delivery,
        activity_progress: body.dati_generali.dati_sal.clone(),
        main_invoice: body.dati_generali.fattura_principale.as_ref().map(|fp| {
            MainInvoiceRef {
                number: fp.numero_fattura_principale.clone().unwrap_or_default(),
                date: fp.data_fattura_principale,
            }
        }),
        vehicle: body.dati_veicoli.as_ref().map(|v| VehicleData {
            registration_date: v.data,
            total_distance: v.totale_percorso.clone(),
        }),
        attachments,
        permanent_establishment: match context.direction {
            ImportDirection::Inbound => header
                .cedente_prestatore
                .as_ref()
                .and_then(|c| c.stabile_organizzazione.as_ref())
                .map(map_permanent_establishment),
            ImportDirection::Outbound => None,
        },
        tax_representative,
        intermediary,
        source_file: context.file_name.clone(),
        inconsistencies: String::new(),
        totals: None,
    };

    // 2.1.1.8 document-level discount/surcharge as a synthetic line
    if context.direction == ImportDirection::Inbound && detail_level == DetailLevel::PerLine {
        apply_global_discount(ledger, config, dgd, &mut invoice, account, &mut log);
    }

    invoice.totals = Some(invoice.compute_totals());
    log.merge(consistency::check(&invoice, body));
    invoice.inconsistencies = log.into_text();

    Ok(ledger.create_invoice(invoice))
}

fn resolve_withholdings<L: Ledger>(
    ledger: &L,
    dgd: &DatiGeneraliDocumento,
    number: &str,
    direction: ImportDirection,
    log: &mut Inconsistencies,
) -> Result<Vec<WithholdingLine>, FatturaError> {
    if dgd.dati_ritenuta.is_empty() {
        return Ok(Vec::new());
    }
    if direction == ImportDirection::Outbound {
        log.push(format!("Invoice {number}: DatiRitenuta not handled"));
        return Ok(Vec::new());
    }

    let configured = ledger.withholding_taxes();
    let mut resolved = Vec::new();
    for rit in &dgd.dati_ritenuta {
        let code_str = rit
            .tipo_ritenuta
            .clone()
            .ok_or(FatturaError::MissingElement("TipoRitenuta"))?;
        let code = WithholdingCode::from_code(&code_str).ok_or(FatturaError::UnknownCode {
            table: "withholding type",
            code: code_str,
        })?;
        let reason = rit
            .causale_pagamento
            .clone()
            .ok_or(FatturaError::MissingElement("CausalePagamento"))?;
        let rate = rit.aliquota_ritenuta.unwrap_or(Decimal::ZERO);

        let with_reason: Vec<_> = configured.iter().filter(|wt| wt.reason == reason).collect();
        if with_reason.is_empty() {
            return Err(FatturaError::UnknownCode {
                table: "withholding tax payment reason",
                code: reason,
            });
        }
        let found = with_reason
            .iter()
            .find(|wt| wt.rate == rate && wt.kind == code.kind())
            .ok_or_else(|| {
                FatturaError::Document(format!(
                    "no withholding tax found with document payment reason {reason}, \
                     rate {rate} and type {:?}",
                    code.kind()
                ))
            })?;
        resolved.push(WithholdingLine {
            code,
            amount: rit.importo_ritenuta.unwrap_or(Decimal::ZERO),
            rate,
            reason,
            tax: found.id,
        });
    }
    Ok(resolved)
}

fn collect_welfare_funds(
    tables: &CodeTables,
    body: &FatturaElettronicaBody,
) -> Result<Vec<WelfareFundLine>, FatturaError> {
    let mut funds = Vec::new();
    for cassa in &body
        .dati_generali
        .dati_generali_documento
        .dati_cassa_previdenziale
    {
        let fund_type = cassa
            .tipo_cassa
            .clone()
            .ok_or(FatturaError::MissingElement("TipoCassa"))?;
        if !tables.welfare_fund_types.contains(&fund_type) {
            return Err(FatturaError::UnknownCode {
                table: "welfare fund",
                code: fund_type,
            });
        }
        funds.push(WelfareFundLine {
            fund_type,
            rate: cassa.al_cassa,
            amount: cassa.importo_contributo_cassa,
            taxable: cassa.imponibile_cassa,
            vat_rate: cassa.aliquota_iva,
            subject_to_withholding: cassa.ritenuta.as_deref() == Some("SI"),
            nature: cassa.natura.clone(),
            pa_line_code: cassa.riferimento_amministrazione.clone(),
        });
    }
    Ok(funds)
}

#[allow(clippy::too_many_arguments)]
fn synthesize_welfare_lines<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    funds: &[WelfareFundLine],
    wt_ids: &[crate::core::WithholdingTaxId],
    account: crate::core::AccountId,
    tax_use: crate::core::TaxUse,
    lines: &mut Vec<InvoiceLine>,
    log: &mut Inconsistencies,
) -> Result<(), FatturaError> {
    let mut sequence = lines.iter().map(|l| l.sequence).max().unwrap_or(0);
    for fund in funds {
        // TC07 (INPS) is settled outside the invoice lines.
        if fund.fund_type == "TC07" {
            continue;
        }
        if fund.subject_to_withholding && wt_ids.is_empty() {
            return Err(FatturaError::Document(format!(
                "welfare fund data {} has withholding tax but no withholding tax \
                 was found in the system",
                fund.fund_type
            )));
        }
        let tax = resolve_tax(
            ledger,
            config,
            fund.vat_rate,
            fund.nature.as_deref(),
            tax_use,
            log,
        );
        sequence += 1;
        let mut line = InvoiceLine {
            sequence,
            name: format!("Welfare Fund: {}", fund.fund_type),
            account: Some(account),
            product: None,
            quantity: Decimal::ONE,
            price_unit: fund.amount.unwrap_or(Decimal::ZERO),
            discount: None,
            tax,
            tax_rate: fund.vat_rate.unwrap_or(Decimal::ZERO),
            tax_nature: fund.nature.clone(),
            admin_ref: fund.pa_line_code.clone(),
            withholdings: if fund.subject_to_withholding {
                wt_ids.to_vec()
            } else {
                Vec::new()
            },
            kind: LineKind::WelfareFund,
        };
        if let Some(product_id) = config.welfare_fund_product {
            line.product = Some(product_id);
            if let Some(product) = ledger.product(product_id) {
                line.name = product.name.clone();
            }
            adjust_accounting_data(ledger, product_id, &mut line, log);
        }
        lines.push(line);
    }
    Ok(())
}

fn map_source_line(line: &DettaglioLinea) -> SourceLine {
    SourceLine {
        line_number: line.numero_linea.unwrap_or(0),
        service_type: line.tipo_cessione_prestazione.clone(),
        name: line.descrizione.clone().unwrap_or_default(),
        quantity: line.quantita,
        unit: line.unita_misura.clone(),
        period_start: line.data_inizio_periodo,
        period_end: line.data_fine_periodo,
        unit_price: line.prezzo_unitario,
        total_price: line.prezzo_totale,
        tax_rate: line.aliquota_iva.unwrap_or(Decimal::ZERO),
        subject_to_withholding: line.ritenuta.as_deref() == Some("SI"),
        tax_nature: line.natura.clone(),
        admin_ref: line.riferimento_amministrazione.clone(),
        article_codes: line
            .codice_articolo
            .iter()
            .map(|c| crate::core::ArticleCode {
                kind: c.codice_tipo.clone().unwrap_or_default(),
                value: c.codice_valore.clone().unwrap_or_default(),
            })
            .collect(),
        discounts: line
            .sconto_maggiorazione
            .iter()
            .filter_map(|s| {
                let kind = DiscountKind::from_code(s.tipo.as_deref().unwrap_or(""))?;
                Some(crate::core::DiscountStep {
                    kind,
                    percentage: s.percentuale,
                    amount: s.importo,
                })
            })
            .collect(),
        other_data: line
            .altri_dati_gestionali
            .iter()
            .map(|d| crate::core::OtherLineData {
                kind: d.tipo_dato.clone().unwrap_or_default(),
                text_ref: d.riferimento_testo.clone(),
                num_ref: d.riferimento_numero,
                date_ref: d.riferimento_data,
            })
            .collect(),
    }
}

/// One record per declared line reference (resolved against the ledger
/// line with that sequence), or a single document-level record.
fn related_records(
    kind: RelatedDocumentKind,
    doc: &DatiDocumentiCorrelati,
    lines: &[InvoiceLine],
) -> Vec<RelatedDocument> {
    let base = RelatedDocument {
        kind,
        name: doc.id_documento.clone().unwrap_or_else(|| "Error".into()),
        line_ref: None,
        linked_line: None,
        date: doc.data,
        num_item: doc.num_item.clone(),
        code: doc.codice_commessa_convenzione.clone(),
        cig: doc.codice_cig.clone(),
        cup: doc.codice_cup.clone(),
    };
    if doc.riferimento_numero_linea.is_empty() {
        return vec![base];
    }
    doc.riferimento_numero_linea
        .iter()
        .map(|numline| {
            let mut record = base.clone();
            record.line_ref = Some(*numline);
            record.linked_line = lines
                .iter()
                .find(|l| l.sequence == *numline)
                .map(|l| l.sequence);
            record
        })
        .collect()
}

fn map_related_documents(
    body: &FatturaElettronicaBody,
    lines: &[InvoiceLine],
) -> Vec<RelatedDocument> {
    let generali = &body.dati_generali;
    let groups = [
        (RelatedDocumentKind::Order, &generali.dati_ordine_acquisto),
        (RelatedDocumentKind::Contract, &generali.dati_contratto),
        (RelatedDocumentKind::Agreement, &generali.dati_convenzione),
        (RelatedDocumentKind::Reception, &generali.dati_ricezione),
        (RelatedDocumentKind::Invoice, &generali.dati_fatture_collegate),
    ];
    let mut records = Vec::new();
    for (kind, docs) in groups {
        for doc in docs {
            records.extend(related_records(kind, doc, lines));
        }
    }
    records
}

fn map_transport_documents(
    body: &FatturaElettronicaBody,
    lines: &[InvoiceLine],
) -> Vec<TransportDocument> {
    let mut records = Vec::new();
    for ddt in &body.dati_generali.dati_ddt {
        let name = ddt.numero_ddt.clone().unwrap_or_default();
        if ddt.riferimento_numero_linea.is_empty() {
            records.push(TransportDocument {
                name,
                date: ddt.data_ddt,
                line_ref: None,
                linked_line: None,
            });
        } else {
            for numline in &ddt.riferimento_numero_linea {
                records.push(TransportDocument {
                    name: name.clone(),
                    date: ddt.data_ddt,
                    line_ref: Some(*numline),
                    linked_line: lines
                        .iter()
                        .find(|l| l.sequence == *numline)
                        .map(|l| l.sequence),
                });
            }
        }
    }
    records
}

fn map_delivery<L: Ledger>(
    ledger: &mut L,
    tables: &CodeTables,
    config: &CompanyConfig,
    trasporto: &crate::schema::DatiTrasporto,
    log: &mut Inconsistencies,
) -> Result<DeliveryData, FatturaError> {
    let carrier = resolve_carrier(ledger, trasporto, &config.country, tables, log)?;
    Ok(DeliveryData {
        carrier,
        vehicle: trasporto.mezzo_trasporto.clone(),
        reason: trasporto.causale_trasporto.clone(),
        packages: trasporto.numero_colli,
        description: trasporto.descrizione.clone(),
        weight_unit: trasporto.unita_misura_peso.clone(),
        gross_weight: trasporto.peso_lordo,
        net_weight: trasporto.peso_netto,
        pickup_datetime: trasporto.data_ora_ritiro,
        transport_date: trasporto.data_inizio_trasporto,
        delivery_datetime: trasporto.data_ora_consegna,
        delivery_address: trasporto.indirizzo_resa.as_ref().map(format_delivery_address),
        incoterms: trasporto.tipo_resa.clone(),
    })
}

fn format_delivery_address(resa: &Sede) -> String {
    format!(
        "{}, {}\n{} - {}\n{} {}",
        resa.indirizzo.as_deref().unwrap_or(""),
        resa.numero_civico.as_deref().unwrap_or(""),
        resa.cap.as_deref().unwrap_or(""),
        resa.comune.as_deref().unwrap_or(""),
        resa.provincia.as_deref().unwrap_or(""),
        resa.nazione.as_deref().unwrap_or(""),
    )
}

fn map_permanent_establishment(sede: &Sede) -> PermanentEstablishment {
    PermanentEstablishment {
        street: sede.indirizzo.clone(),
        number: sede.numero_civico.clone(),
        zip: sede.cap.clone(),
        city: sede.comune.clone(),
        province: sede.provincia.clone(),
        country: sede.nazione.clone(),
    }
}

fn map_payments<L: Ledger>(
    ledger: &mut L,
    body: &FatturaElettronicaBody,
    partner_id: PartnerId,
    log: &mut Inconsistencies,
) -> Result<Vec<PaymentBlock>, FatturaError> {
    let mut blocks = Vec::new();
    for payment in &body.dati_pagamento {
        let cond = payment
            .condizioni_pagamento
            .clone()
            .ok_or_else(|| FatturaError::Document("payment term code not found in document".into()))?;
        let terms = ledger
            .payment_term_by_fiscal_code(&cond)
            .ok_or(FatturaError::UnknownCode {
                table: "payment term",
                code: cond,
            })?;

        let mut details = Vec::new();
        for dline in &payment.dettaglio_pagamento {
            let method_code = dline
                .modalita_pagamento
                .clone()
                .ok_or(FatturaError::MissingElement("ModalitaPagamento"))?;
            let method =
                ledger
                    .payment_method_by_code(&method_code)
                    .ok_or(FatturaError::UnknownCode {
                        table: "payment method",
                        code: method_code,
                    })?;

            // Bank registry via BIC; creatable only when a name is declared.
            let mut bank = None;
            if let Some(bic) = dline.bic.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
                bank = ledger.bank_by_bic(bic);
                if bank.is_none() {
                    match dline.istituto_finanziario.as_deref() {
                        Some(name) if !name.is_empty() => {
                            let id = ledger.create_bank(name, bic);
                            bank = Some(crate::ledger::Bank {
                                id,
                                name: name.to_string(),
                                bic: bic.to_string(),
                            });
                        }
                        _ => log.push(format!(
                            "Name of Bank with BIC '{bic}' is not set. Can't create bank"
                        )),
                    }
                }
            }

            let mut partner_bank = None;
            if let Some(iban) = dline.iban.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
                partner_bank = ledger.partner_bank_by_iban(partner_id, iban);
                if partner_bank.is_none() {
                    match &bank {
                        Some(bank) => {
                            partner_bank = Some(ledger.create_partner_bank(PartnerBank {
                                id: crate::core::PartnerBankId(0),
                                partner: partner_id,
                                iban: iban.to_string(),
                                bank: Some(bank.id),
                                bank_name: dline
                                    .istituto_finanziario
                                    .clone()
                                    .or_else(|| Some(bank.name.clone())),
                                bic: dline.bic.clone().or_else(|| Some(bank.bic.clone())),
                            }));
                        }
                        None => log.push(format!(
                            "BIC is required and not exist in Xml\nCurr bank data is: \n\
                             IBAN: {iban}\nBank Name: {}\n",
                            dline.istituto_finanziario.as_deref().unwrap_or("")
                        )),
                    }
                }
            }

            details.push(PaymentDetail {
                recipient: dline.beneficiario.clone(),
                method: Some(method),
                term_start: dline.data_riferimento_termini_pagamento,
                term_days: dline.giorni_termini_pagamento,
                due_date: dline.data_scadenza_pagamento,
                amount: dline.importo_pagamento.unwrap_or(Decimal::ZERO),
                post_office_code: dline.cod_ufficio_postale.clone(),
                payee_surname: dline.cognome_quietanzante.clone(),
                payee_name: dline.nome_quietanzante.clone(),
                payee_fiscal_code: dline.cf_quietanzante.clone(),
                payee_title: dline.titolo_quietanzante.clone(),
                bank_name: dline.istituto_finanziario.clone(),
                iban: dline.iban.clone(),
                abi: dline.abi.clone(),
                cab: dline.cab.clone(),
                bic: dline.bic.clone(),
                partner_bank,
                prepayment_discount: dline.sconto_pagamento_anticipato,
                max_advance_date: dline.data_limite_pagamento_anticipato,
                penalty_amount: dline.penalita_pagamenti_ritardati,
                penalty_date: dline.data_decorrenza_penale,
                payment_code: dline.codice_pagamento.clone(),
            });
        }
        blocks.push(PaymentBlock { terms, details });
    }
    Ok(blocks)
}

/// Apply a document-level discount/surcharge as one synthetic line.
///
/// Percentage steps apply to the running tax-inclusive total, amount
/// steps verbatim; SC subtracts, MG adds.
fn apply_global_discount<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    dgd: &DatiGeneraliDocumento,
    invoice: &mut Invoice,
    account: crate::core::AccountId,
    log: &mut Inconsistencies,
) {
    if dgd.sconto_maggiorazione.is_empty() {
        return;
    }
    let total = invoice.compute_totals().amount_total;
    let mut discount = Decimal::ZERO;
    for step in &dgd.sconto_maggiorazione {
        let kind = DiscountKind::from_code(step.tipo.as_deref().unwrap_or(""));
        let amount = match (step.percentuale.filter(|p| !p.is_zero()), step.importo) {
            (Some(pct), _) => total * pct / Decimal::ONE_HUNDRED,
            (None, Some(importo)) => importo,
            (None, None) => continue,
        };
        match kind {
            Some(DiscountKind::Discount) => discount -= amount,
            Some(DiscountKind::Surcharge) => discount += amount,
            None => {}
        }
    }

    let sequence = invoice.max_line_sequence() + 1;
    let mut line = InvoiceLine {
        sequence,
        name: "Global bill discount from document general data".to_string(),
        account: Some(account),
        product: None,
        quantity: Decimal::ONE,
        price_unit: discount,
        discount: None,
        tax: None,
        tax_rate: Decimal::ZERO,
        tax_nature: None,
        admin_ref: None,
        withholdings: Vec::new(),
        kind: LineKind::GlobalDiscount,
    };
    if let Some(product_id) = config.global_discount_product {
        line.product = Some(product_id);
        if let Some(product) = ledger.product(product_id) {
            line.name = product.name.clone();
        }
        adjust_accounting_data(ledger, product_id, &mut line, log);
    }
    invoice.lines.push(line);
}
