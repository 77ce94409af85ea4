//! Export assembly: serialize ledger invoices back into FatturaPA XML.
//!
//! Invoices are grouped by counterparty; each group is chunked and every
//! chunk becomes one transmission with its own 5-character alphanumeric
//! id, collision-checked against previously issued file names.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use tracing::info;

use crate::core::{
    round_half_up, AttachmentRef, FatturaError, Invoice, InvoiceId, PartnerId, TaxSummary,
};
use crate::ledger::{CompanyConfig, Ledger, Partner};
use crate::schema::{
    self, Allegato, Anagrafica, CedentePrestatore, CessionarioCommittente, Contatti,
    DatiAnagrafici, DatiBollo, DatiCassaPrevidenziale, DatiGenerali, DatiGeneraliDocumento,
    DatiPagamento, DatiRiepilogo, DatiRitenuta, DatiTrasmissione, DettaglioLinea,
    DettaglioPagamento, FatturaElettronica, FatturaElettronicaBody, FatturaElettronicaHeader,
    IdFiscale, ScontoMaggiorazione, Sede,
};

/// Source of transmission ids (ProgressivoInvio).
///
/// No randomness crate appears in this stack; the default implementation
/// is a time-seeded xorshift, and tests seed it for determinism.
pub trait TransmissionIdSource {
    fn next_id(&mut self) -> String;
}

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 5;

/// Default xorshift-based id source.
#[derive(Debug, Clone)]
pub struct TransmissionIds {
    state: u64,
}

impl TransmissionIds {
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E3779B97F4A7C15);
        Self::seeded(nanos)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl TransmissionIdSource for TransmissionIds {
    fn next_id(&mut self) -> String {
        (0..ID_LENGTH)
            .map(|_| {
                let idx = (self.next_u64() % ID_ALPHABET.len() as u64) as usize;
                ID_ALPHABET[idx] as char
            })
            .collect()
    }
}

/// Export parameters.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Bundle a partner's invoices into multi-body documents instead of
    /// one document per invoice.
    pub grouped: bool,
    /// Maximum bodies per document when grouping.
    pub chunk_size: usize,
    /// Pre-rendered print documents to embed per invoice (rendering is
    /// the embedder's concern).
    pub print_attachments: Vec<(InvoiceId, AttachmentRef)>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            grouped: false,
            chunk_size: 1000,
            print_attachments: Vec::new(),
        }
    }
}

/// One generated transmission file.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    /// `{vat}_{transmission id}.xml`
    pub file_name: String,
    pub transmission_id: String,
    pub partner: PartnerId,
    pub invoices: Vec<InvoiceId>,
    pub xml: String,
}

/// Export a set of ledger invoices, grouped by counterparty and chunked.
pub fn export_invoices<L: Ledger, S: TransmissionIdSource>(
    ledger: &mut L,
    config: &CompanyConfig,
    invoice_ids: &[InvoiceId],
    options: &ExportOptions,
    ids: &mut S,
) -> Result<Vec<ExportedFile>, FatturaError> {
    let mut by_partner: BTreeMap<PartnerId, Vec<Invoice>> = BTreeMap::new();
    for id in invoice_ids {
        let invoice = ledger.invoice(*id).ok_or(FatturaError::Dangling {
            entity: "invoice",
            id: id.0,
        })?;
        by_partner.entry(invoice.partner).or_default().push(invoice);
    }

    let mut files = Vec::new();
    for (partner_id, invoices) in by_partner {
        check_payment_codes(ledger, &invoices)?;
        let chunk_size = if options.grouped { options.chunk_size } else { 1 };
        for chunk in invoices.chunks(chunk_size.max(1)) {
            // Re-draw on collision with any already-issued file name.
            let mut transmission_id = ids.next_id();
            while ledger.export_name_exists(&transmission_id) {
                transmission_id = ids.next_id();
            }
            ledger.record_export_name(&transmission_id);

            let doc = build_document(ledger, config, partner_id, chunk, &transmission_id, options)?;
            let xml = schema::write(&doc)?;
            let file_name = format!("{}_{transmission_id}.xml", config.vat());
            info!(%file_name, bodies = chunk.len(), "export document assembled");
            files.push(ExportedFile {
                file_name,
                transmission_id,
                partner: partner_id,
                invoices: chunk.iter().map(|i| i.id).collect(),
                xml,
            });
        }
    }
    Ok(files)
}

/// Outbound documents cannot be transmitted without fiscal payment codes:
/// every invoice needs a payment term carrying both the TPxx code and a
/// fiscal payment method.
fn check_payment_codes<L: Ledger>(ledger: &L, invoices: &[Invoice]) -> Result<(), FatturaError> {
    for invoice in invoices {
        let term = invoice
            .payment_term
            .and_then(|id| ledger.payment_term(id))
            .ok_or_else(|| {
                FatturaError::MissingConfiguration(format!(
                    "invoice {} has no payment term with fiscal codes",
                    invoice.number
                ))
            })?;
        if term.fiscal_code.is_none() {
            return Err(FatturaError::MissingConfiguration(format!(
                "invoice {}: fiscal payment term must be set for payment term {}",
                invoice.number, term.name
            )));
        }
        if term.fiscal_method.is_none() {
            return Err(FatturaError::MissingConfiguration(format!(
                "invoice {}: fiscal payment method must be set for payment term {}",
                invoice.number, term.name
            )));
        }
    }
    Ok(())
}

/// Build the schema tree for one chunk of same-partner invoices.
pub fn build_document<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    partner_id: PartnerId,
    invoices: &[Invoice],
    transmission_id: &str,
    options: &ExportOptions,
) -> Result<FatturaElettronica, FatturaError> {
    if invoices.iter().any(|i| i.partner != partner_id) {
        let numbers: Vec<&str> = invoices.iter().map(|i| i.number.as_str()).collect();
        return Err(FatturaError::MixedPartners(numbers.join(", ")));
    }
    let partner = ledger.partner(partner_id).ok_or(FatturaError::Dangling {
        entity: "partner",
        id: partner_id.0,
    })?;

    let header = build_header(config, &partner, transmission_id);
    let mut bodies = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        bodies.push(build_body(ledger, invoice, options)?);
    }
    Ok(FatturaElettronica { header, bodies })
}

fn build_header(
    config: &CompanyConfig,
    partner: &Partner,
    transmission_id: &str,
) -> FatturaElettronicaHeader {
    let codice_destinatario = partner
        .codice_destinatario
        .clone()
        .unwrap_or_else(|| "0000000".to_string());

    FatturaElettronicaHeader {
        dati_trasmissione: Some(DatiTrasmissione {
            id_trasmittente: Some(IdFiscale {
                id_paese: Some(config.transmitter_country.clone()),
                id_codice: Some(config.transmitter_code.clone()),
            }),
            progressivo_invio: Some(transmission_id.to_string()),
            formato_trasmissione: Some("FPR12".to_string()),
            codice_destinatario: Some(codice_destinatario),
            pec_destinatario: partner.pec.clone(),
            contatti_trasmittente: None,
        }),
        cedente_prestatore: Some(CedentePrestatore {
            dati_anagrafici: Some(DatiAnagrafici {
                id_fiscale_iva: Some(IdFiscale {
                    id_paese: Some(config.vat_country.clone()),
                    id_codice: Some(config.vat_code.clone()),
                }),
                codice_fiscale: config.fiscal_code.clone(),
                anagrafica: Some(Anagrafica {
                    denominazione: Some(config.name.clone()),
                    ..Default::default()
                }),
                regime_fiscale: Some(config.fiscal_regime.clone()),
                ..Default::default()
            }),
            sede: Some(Sede {
                indirizzo: config.street.clone(),
                numero_civico: None,
                cap: config.zip.clone(),
                comune: config.city.clone(),
                provincia: config.province.clone(),
                nazione: Some(config.country.clone()),
            }),
            stabile_organizzazione: None,
            iscrizione_rea: None,
            contatti: match (&config.phone, &config.email) {
                (None, None) => None,
                (phone, email) => Some(Contatti {
                    telefono: phone.clone(),
                    fax: None,
                    email: email.clone(),
                }),
            },
            riferimento_amministrazione: None,
        }),
        rappresentante_fiscale: None,
        cessionario_committente: Some(build_customer(partner)),
        terzo_intermediario: None,
        soggetto_emittente: None,
    }
}

fn build_customer(partner: &Partner) -> CessionarioCommittente {
    let id_fiscale_iva = partner.vat.as_deref().and_then(|vat| {
        if vat.len() > 2 {
            Some(IdFiscale {
                id_paese: Some(vat[..2].to_string()),
                id_codice: Some(vat[2..].to_string()),
            })
        } else {
            None
        }
    });
    let anagrafica = if partner.is_company {
        Anagrafica {
            denominazione: Some(partner.name.clone()),
            ..Default::default()
        }
    } else {
        Anagrafica {
            nome: partner.firstname.clone(),
            cognome: partner.lastname.clone(),
            // A person record without split names still needs a name.
            denominazione: if partner.firstname.is_none() && partner.lastname.is_none() {
                Some(partner.name.clone())
            } else {
                None
            },
            ..Default::default()
        }
    };
    CessionarioCommittente {
        dati_anagrafici: Some(DatiAnagrafici {
            id_fiscale_iva,
            codice_fiscale: partner.fiscal_code.clone(),
            anagrafica: Some(anagrafica),
            ..Default::default()
        }),
        sede: Some(Sede {
            indirizzo: partner.street.clone(),
            numero_civico: None,
            cap: partner.zip.clone(),
            comune: partner.city.clone(),
            provincia: partner.province.clone(),
            nazione: partner.country.clone(),
        }),
        stabile_organizzazione: None,
    }
}

fn build_body<L: Ledger>(
    ledger: &L,
    invoice: &Invoice,
    options: &ExportOptions,
) -> Result<FatturaElettronicaBody, FatturaError> {
    let totals = invoice.compute_totals();

    let dati_ritenuta = invoice
        .withholdings
        .iter()
        .map(|w| DatiRitenuta {
            tipo_ritenuta: Some(w.code.code().to_string()),
            importo_ritenuta: Some(w.amount),
            aliquota_ritenuta: Some(w.rate),
            causale_pagamento: Some(w.reason.clone()),
        })
        .collect();

    let dati_cassa_previdenziale = invoice
        .welfare_funds
        .iter()
        .map(|f| DatiCassaPrevidenziale {
            tipo_cassa: Some(f.fund_type.clone()),
            al_cassa: f.rate,
            importo_contributo_cassa: f.amount,
            imponibile_cassa: f.taxable,
            aliquota_iva: f.vat_rate,
            ritenuta: f.subject_to_withholding.then(|| "SI".to_string()),
            natura: f.nature.clone(),
            riferimento_amministrazione: f.pa_line_code.clone(),
        })
        .collect();

    let causale: Vec<String> = invoice
        .comment
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let dati_generali_documento = DatiGeneraliDocumento {
        tipo_documento: Some(invoice.document_type.clone()),
        divisa: Some(invoice.currency.clone()),
        data: Some(invoice.document_date),
        numero: Some(invoice.number.clone()),
        dati_ritenuta,
        dati_bollo: invoice.stamp_duty.as_ref().map(|s| DatiBollo {
            bollo_virtuale: s.virtual_stamp.then(|| "SI".to_string()),
            importo_bollo: s.amount,
        }),
        dati_cassa_previdenziale,
        sconto_maggiorazione: Vec::new(),
        importo_totale_documento: Some(totals.amount_total),
        arrotondamento: invoice.rounding,
        causale,
        art73: invoice.art73.then(|| "SI".to_string()),
    };

    let dettaglio_linee = invoice.lines.iter().map(build_line).collect();
    let dati_riepilogo = build_summaries(invoice);

    let dati_pagamento = build_payments(ledger, invoice, &totals.amount_total)?;

    let mut allegati: Vec<Allegato> = invoice
        .attachments
        .iter()
        .map(|a| Allegato {
            nome_attachment: Some(a.name.clone()),
            algoritmo_compressione: a.compression.clone(),
            formato_attachment: a.format.clone(),
            descrizione_attachment: a.description.clone(),
            attachment: Some(a.data.clone()),
        })
        .collect();
    for (id, print) in &options.print_attachments {
        if *id == invoice.id {
            allegati.push(Allegato {
                nome_attachment: Some(print.name.clone()),
                algoritmo_compressione: print.compression.clone(),
                formato_attachment: print.format.clone(),
                descrizione_attachment: print.description.clone(),
                attachment: Some(print.data.clone()),
            });
        }
    }

    Ok(FatturaElettronicaBody {
        dati_generali: DatiGenerali {
            dati_generali_documento,
            ..Default::default()
        },
        dati_beni_servizi: crate::schema::DatiBeniServizi {
            dettaglio_linee,
            dati_riepilogo,
        },
        dati_veicoli: None,
        dati_pagamento,
        allegati,
    })
}

fn build_line(line: &crate::core::InvoiceLine) -> DettaglioLinea {
    let sconto_maggiorazione = match line.discount {
        Some(pct) if !pct.is_zero() => vec![ScontoMaggiorazione {
            tipo: Some("SC".to_string()),
            percentuale: Some(pct),
            importo: None,
        }],
        _ => Vec::new(),
    };
    DettaglioLinea {
        numero_linea: Some(line.sequence),
        descrizione: Some(line.name.clone()),
        quantita: Some(line.quantity),
        prezzo_unitario: Some(line.price_unit),
        sconto_maggiorazione,
        prezzo_totale: Some(line.net_amount()),
        aliquota_iva: Some(line.tax_rate),
        ritenuta: (!line.withholdings.is_empty()).then(|| "SI".to_string()),
        natura: line.tax_nature.clone(),
        riferimento_amministrazione: line.admin_ref.clone(),
        ..Default::default()
    }
}

/// Per-rate summary blocks: the stored blocks when the invoice carries
/// them (imported documents), else recomputed by grouping the lines.
fn build_summaries(invoice: &Invoice) -> Vec<DatiRiepilogo> {
    if !invoice.summaries.is_empty() {
        return invoice
            .summaries
            .iter()
            .map(|s: &TaxSummary| DatiRiepilogo {
                aliquota_iva: Some(s.tax_rate),
                natura: s.nature.clone(),
                spese_accessorie: s.incidental_charges,
                arrotondamento: s.rounding,
                imponibile_importo: Some(s.taxable_amount),
                imposta: Some(s.tax_amount),
                esigibilita_iva: s.payability.clone(),
                riferimento_normativo: s.law_reference.clone(),
            })
            .collect();
    }

    let mut groups: BTreeMap<(Decimal, Option<String>), Decimal> = BTreeMap::new();
    for line in &invoice.lines {
        *groups
            .entry((line.tax_rate, line.tax_nature.clone()))
            .or_insert(Decimal::ZERO) += line.net_amount();
    }
    groups
        .into_iter()
        .map(|((rate, nature), taxable)| DatiRiepilogo {
            aliquota_iva: Some(rate),
            natura: nature,
            spese_accessorie: None,
            arrotondamento: None,
            imponibile_importo: Some(taxable),
            imposta: Some(round_half_up(taxable * rate / Decimal::ONE_HUNDRED, 2)),
            esigibilita_iva: None,
            riferimento_normativo: None,
        })
        .collect()
}

fn build_payments<L: Ledger>(
    ledger: &L,
    invoice: &Invoice,
    amount_total: &Decimal,
) -> Result<Vec<DatiPagamento>, FatturaError> {
    // Imported payment blocks round-trip as declared.
    if !invoice.payments.is_empty() {
        let mut blocks = Vec::new();
        for payment in &invoice.payments {
            let term = ledger.payment_term(payment.terms);
            let condizioni = term.and_then(|t| t.fiscal_code);
            let dettaglio = payment
                .details
                .iter()
                .map(|d| DettaglioPagamento {
                    beneficiario: d.recipient.clone(),
                    modalita_pagamento: d
                        .method
                        .and_then(|m| ledger.payment_method(m))
                        .map(|m| m.code),
                    data_riferimento_termini_pagamento: d.term_start,
                    giorni_termini_pagamento: d.term_days,
                    data_scadenza_pagamento: d.due_date,
                    importo_pagamento: Some(d.amount),
                    cod_ufficio_postale: d.post_office_code.clone(),
                    cognome_quietanzante: d.payee_surname.clone(),
                    nome_quietanzante: d.payee_name.clone(),
                    cf_quietanzante: d.payee_fiscal_code.clone(),
                    titolo_quietanzante: d.payee_title.clone(),
                    istituto_finanziario: d.bank_name.clone(),
                    iban: d.iban.clone(),
                    abi: d.abi.clone(),
                    cab: d.cab.clone(),
                    bic: d.bic.clone(),
                    sconto_pagamento_anticipato: d.prepayment_discount,
                    data_limite_pagamento_anticipato: d.max_advance_date,
                    penalita_pagamenti_ritardati: d.penalty_amount,
                    data_decorrenza_penale: d.penalty_date,
                    codice_pagamento: d.payment_code.clone(),
                })
                .collect();
            blocks.push(DatiPagamento {
                condizioni_pagamento: condizioni,
                dettaglio_pagamento: dettaglio,
            });
        }
        return Ok(blocks);
    }

    // Native ledger invoices: one block from the fiscal payment term.
    let Some(term) = invoice.payment_term.and_then(|id| ledger.payment_term(id)) else {
        return Ok(Vec::new());
    };
    let method_code = term
        .fiscal_method
        .and_then(|m| ledger.payment_method(m))
        .map(|m| m.code);
    Ok(vec![DatiPagamento {
        condizioni_pagamento: term.fiscal_code.clone(),
        dettaglio_pagamento: vec![DettaglioPagamento {
            modalita_pagamento: method_code,
            data_scadenza_pagamento: invoice.due_date,
            importo_pagamento: Some(*amount_total),
            ..Default::default()
        }],
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_source_yields_five_alphanumerics() {
        let mut ids = TransmissionIds::seeded(42);
        for _ in 0..100 {
            let id = ids.next_id();
            assert_eq!(id.len(), 5);
            assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn seeded_sources_are_deterministic() {
        let mut a = TransmissionIds::seeded(7);
        let mut b = TransmissionIds::seeded(7);
        assert_eq!(a.next_id(), b.next_id());
        assert_eq!(a.next_id(), b.next_id());
    }
}
