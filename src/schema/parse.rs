use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::types::*;
use crate::core::FatturaError;

/// Parse a FatturaPA XML document into the typed tree.
///
/// Namespace prefixes vary between transmitters (`p:`, `ns2:`, none), so
/// elements are matched by local name. Values that violate the schema's
/// decimal/date patterns are fatal; structurally unknown elements are
/// skipped.
pub fn parse(xml: &str) -> Result<FatturaElettronica, FatturaError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut p = DocParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref());
                p.open(&name);
                p.path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref());
                p.open(&name);
                p.close(&name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| FatturaError::Xml(format!("bad text content: {e}")))?
                    .to_string();
                if !text.is_empty() {
                    p.handle_text(&text)?;
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).to_string();
                if !text.is_empty() {
                    p.handle_text(&text)?;
                }
            }
            Ok(Event::End(_)) => {
                if let Some(name) = p.path.pop() {
                    p.close(&name);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FatturaError::Xml(format!("XML parse error: {e}"))),
            _ => {}
        }
    }

    if p.doc.bodies.is_empty() {
        return Err(FatturaError::MissingElement("FatturaElettronicaBody"));
    }
    Ok(p.doc)
}

fn local_name(qname: &[u8]) -> String {
    let name = std::str::from_utf8(qname).unwrap_or("");
    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_string(),
        None => name.to_string(),
    }
}

fn parse_decimal(element: &'static str, text: &str) -> Result<Decimal, FatturaError> {
    Decimal::from_str(text.trim())
        .map_err(|_| FatturaError::Xml(format!("{element}: invalid decimal '{text}'")))
}

fn parse_date(element: &'static str, text: &str) -> Result<NaiveDate, FatturaError> {
    // Some transmitters append a time or zone part to date-only fields.
    let head = text.trim();
    let head = if head.len() > 10 { &head[..10] } else { head };
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .map_err(|_| FatturaError::Xml(format!("{element}: invalid date '{text}'")))
}

/// Lenient date-time parse; the schema allows fractional seconds and zone
/// offsets that the ledger does not care about.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let head = text.trim();
    let head = if head.len() > 19 { &head[..19] } else { head };
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()
}

fn parse_u32(element: &'static str, text: &str) -> Result<u32, FatturaError> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| FatturaError::Xml(format!("{element}: invalid number '{text}'")))
}

#[derive(Default)]
struct DocParser {
    doc: FatturaElettronica,
    path: Vec<String>,

    current_body: Option<FatturaElettronicaBody>,
    current_line: Option<DettaglioLinea>,
    current_summary: Option<DatiRiepilogo>,
    current_payment: Option<DatiPagamento>,
    current_payment_detail: Option<DettaglioPagamento>,
    current_related: Option<DatiDocumentiCorrelati>,
    current_ddt: Option<DatiDdt>,
    current_sconto: Option<ScontoMaggiorazione>,
    current_ritenuta: Option<DatiRitenuta>,
    current_cassa: Option<DatiCassaPrevidenziale>,
    current_allegato: Option<Allegato>,
    current_articolo: Option<CodiceArticolo>,
    current_altri_dati: Option<AltriDatiGestionali>,
}

impl DocParser {
    fn has(&self, name: &str) -> bool {
        self.path.iter().any(|p| p == name)
    }

    fn leaf(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// Start of an element: allocate the accumulator for repeating blocks.
    fn open(&mut self, name: &str) {
        match name {
            "FatturaElettronicaBody" => self.current_body = Some(Default::default()),
            "DettaglioLinee" => self.current_line = Some(Default::default()),
            "DatiRiepilogo" => self.current_summary = Some(Default::default()),
            "DatiPagamento" => self.current_payment = Some(Default::default()),
            "DettaglioPagamento" => self.current_payment_detail = Some(Default::default()),
            "DatiOrdineAcquisto" | "DatiContratto" | "DatiConvenzione" | "DatiRicezione"
            | "DatiFattureCollegate" => self.current_related = Some(Default::default()),
            "DatiDDT" => self.current_ddt = Some(Default::default()),
            "ScontoMaggiorazione" => self.current_sconto = Some(Default::default()),
            "DatiRitenuta" => self.current_ritenuta = Some(Default::default()),
            "DatiCassaPrevidenziale" => self.current_cassa = Some(Default::default()),
            "Allegati" => self.current_allegato = Some(Default::default()),
            "CodiceArticolo" => self.current_articolo = Some(Default::default()),
            "AltriDatiGestionali" => self.current_altri_dati = Some(Default::default()),
            _ => {}
        }
    }

    /// End of an element: attach the finished accumulator to its parent.
    fn close(&mut self, name: &str) {
        match name {
            "FatturaElettronicaBody" => {
                if let Some(body) = self.current_body.take() {
                    self.doc.bodies.push(body);
                }
            }
            "DettaglioLinee" => {
                if let (Some(line), Some(body)) =
                    (self.current_line.take(), self.current_body.as_mut())
                {
                    body.dati_beni_servizi.dettaglio_linee.push(line);
                }
            }
            "DatiRiepilogo" => {
                if let (Some(summary), Some(body)) =
                    (self.current_summary.take(), self.current_body.as_mut())
                {
                    body.dati_beni_servizi.dati_riepilogo.push(summary);
                }
            }
            "DatiPagamento" => {
                if let (Some(payment), Some(body)) =
                    (self.current_payment.take(), self.current_body.as_mut())
                {
                    body.dati_pagamento.push(payment);
                }
            }
            "DettaglioPagamento" => {
                if let (Some(detail), Some(payment)) = (
                    self.current_payment_detail.take(),
                    self.current_payment.as_mut(),
                ) {
                    payment.dettaglio_pagamento.push(detail);
                }
            }
            "DatiOrdineAcquisto" | "DatiContratto" | "DatiConvenzione" | "DatiRicezione"
            | "DatiFattureCollegate" => {
                if let (Some(related), Some(body)) =
                    (self.current_related.take(), self.current_body.as_mut())
                {
                    let generali = &mut body.dati_generali;
                    match name {
                        "DatiOrdineAcquisto" => generali.dati_ordine_acquisto.push(related),
                        "DatiContratto" => generali.dati_contratto.push(related),
                        "DatiConvenzione" => generali.dati_convenzione.push(related),
                        "DatiRicezione" => generali.dati_ricezione.push(related),
                        _ => generali.dati_fatture_collegate.push(related),
                    }
                }
            }
            "DatiDDT" => {
                if let (Some(ddt), Some(body)) =
                    (self.current_ddt.take(), self.current_body.as_mut())
                {
                    body.dati_generali.dati_ddt.push(ddt);
                }
            }
            "ScontoMaggiorazione" => {
                if let Some(sconto) = self.current_sconto.take() {
                    if let Some(line) = self.current_line.as_mut() {
                        line.sconto_maggiorazione.push(sconto);
                    } else if let Some(body) = self.current_body.as_mut() {
                        body.dati_generali
                            .dati_generali_documento
                            .sconto_maggiorazione
                            .push(sconto);
                    }
                }
            }
            "DatiRitenuta" => {
                if let (Some(rit), Some(body)) =
                    (self.current_ritenuta.take(), self.current_body.as_mut())
                {
                    body.dati_generali
                        .dati_generali_documento
                        .dati_ritenuta
                        .push(rit);
                }
            }
            "DatiCassaPrevidenziale" => {
                if let (Some(cassa), Some(body)) =
                    (self.current_cassa.take(), self.current_body.as_mut())
                {
                    body.dati_generali
                        .dati_generali_documento
                        .dati_cassa_previdenziale
                        .push(cassa);
                }
            }
            "Allegati" => {
                if let (Some(att), Some(body)) =
                    (self.current_allegato.take(), self.current_body.as_mut())
                {
                    body.allegati.push(att);
                }
            }
            "CodiceArticolo" => {
                if let (Some(art), Some(line)) =
                    (self.current_articolo.take(), self.current_line.as_mut())
                {
                    line.codice_articolo.push(art);
                }
            }
            "AltriDatiGestionali" => {
                if let (Some(dato), Some(line)) =
                    (self.current_altri_dati.take(), self.current_line.as_mut())
                {
                    line.altri_dati_gestionali.push(dato);
                }
            }
            _ => {}
        }
    }

    /// The DatiAnagrafici block the cursor is currently inside, if any.
    /// Checked innermost-first: the carrier variant lives inside a body
    /// while the four header parties are mutually exclusive siblings.
    fn anagrafici_mut(&mut self) -> Option<&mut DatiAnagrafici> {
        if self.has("DatiAnagraficiVettore") {
            let body = self.current_body.as_mut()?;
            let trasporto = body
                .dati_generali
                .dati_trasporto
                .get_or_insert_with(Default::default);
            return Some(
                trasporto
                    .dati_anagrafici_vettore
                    .get_or_insert_with(Default::default),
            );
        }
        if !self.has("DatiAnagrafici") {
            return None;
        }
        let header = &mut self.doc.header;
        if self.path.iter().any(|p| p == "TerzoIntermediarioOSoggettoEmittente") {
            let terzo = header.terzo_intermediario.get_or_insert_with(Default::default);
            Some(terzo.dati_anagrafici.get_or_insert_with(Default::default))
        } else if self.path.iter().any(|p| p == "RappresentanteFiscale")
            && !self.path.iter().any(|p| p == "CessionarioCommittente")
        {
            let rapp = header
                .rappresentante_fiscale
                .get_or_insert_with(Default::default);
            Some(rapp.dati_anagrafici.get_or_insert_with(Default::default))
        } else if self.path.iter().any(|p| p == "CessionarioCommittente") {
            let cess = header
                .cessionario_committente
                .get_or_insert_with(Default::default);
            Some(cess.dati_anagrafici.get_or_insert_with(Default::default))
        } else if self.path.iter().any(|p| p == "CedentePrestatore") {
            let ced = header.cedente_prestatore.get_or_insert_with(Default::default);
            Some(ced.dati_anagrafici.get_or_insert_with(Default::default))
        } else {
            None
        }
    }

    /// The address block the cursor is currently inside (Sede,
    /// StabileOrganizzazione or IndirizzoResa), if any.
    fn sede_mut(&mut self) -> Option<&mut Sede> {
        let in_resa = self.has("IndirizzoResa");
        let in_stabile = self.has("StabileOrganizzazione");
        let in_sede = self.has("Sede");
        if in_resa {
            let body = self.current_body.as_mut()?;
            let trasporto = body
                .dati_generali
                .dati_trasporto
                .get_or_insert_with(Default::default);
            return Some(trasporto.indirizzo_resa.get_or_insert_with(Default::default));
        }
        if !in_stabile && !in_sede {
            return None;
        }
        let header = &mut self.doc.header;
        if self.path.iter().any(|p| p == "CessionarioCommittente") {
            let cess = header
                .cessionario_committente
                .get_or_insert_with(Default::default);
            if in_stabile {
                Some(cess.stabile_organizzazione.get_or_insert_with(Default::default))
            } else {
                Some(cess.sede.get_or_insert_with(Default::default))
            }
        } else if self.path.iter().any(|p| p == "CedentePrestatore") {
            let ced = header.cedente_prestatore.get_or_insert_with(Default::default);
            if in_stabile {
                Some(ced.stabile_organizzazione.get_or_insert_with(Default::default))
            } else {
                Some(ced.sede.get_or_insert_with(Default::default))
            }
        } else {
            None
        }
    }

    fn handle_text(&mut self, text: &str) -> Result<(), FatturaError> {
        let leaf = self.leaf().to_string();
        let leaf = leaf.as_str();

        // -- 1.1 DatiTrasmissione -------------------------------------------
        if self.has("DatiTrasmissione") {
            let tras = self
                .doc
                .header
                .dati_trasmissione
                .get_or_insert_with(Default::default);
            match leaf {
                "IdPaese" => {
                    let id = tras.id_trasmittente.get_or_insert_with(Default::default);
                    id.id_paese = Some(text.to_string());
                }
                "IdCodice" => {
                    let id = tras.id_trasmittente.get_or_insert_with(Default::default);
                    id.id_codice = Some(text.to_string());
                }
                "ProgressivoInvio" => tras.progressivo_invio = Some(text.to_string()),
                "FormatoTrasmissione" => tras.formato_trasmissione = Some(text.to_string()),
                "CodiceDestinatario" => tras.codice_destinatario = Some(text.to_string()),
                "PECDestinatario" => tras.pec_destinatario = Some(text.to_string()),
                "Telefono" | "Email" => {
                    let contatti = tras
                        .contatti_trasmittente
                        .get_or_insert_with(Default::default);
                    if leaf == "Telefono" {
                        contatti.telefono = Some(text.to_string());
                    } else {
                        contatti.email = Some(text.to_string());
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        // -- Party identity blocks ------------------------------------------
        if self.has("DatiAnagrafici") || self.has("DatiAnagraficiVettore") {
            let value = text.to_string();
            if let Some(ana) = self.anagrafici_mut() {
                match leaf {
                    "IdPaese" => {
                        let id = ana.id_fiscale_iva.get_or_insert_with(Default::default);
                        id.id_paese = Some(value);
                    }
                    "IdCodice" => {
                        let id = ana.id_fiscale_iva.get_or_insert_with(Default::default);
                        id.id_codice = Some(value);
                    }
                    "CodiceFiscale" => ana.codice_fiscale = Some(value),
                    "Denominazione" => {
                        ana.anagrafica.get_or_insert_with(Default::default).denominazione =
                            Some(value);
                    }
                    "Nome" => {
                        ana.anagrafica.get_or_insert_with(Default::default).nome = Some(value);
                    }
                    "Cognome" => {
                        ana.anagrafica.get_or_insert_with(Default::default).cognome = Some(value);
                    }
                    "Titolo" => {
                        ana.anagrafica.get_or_insert_with(Default::default).titolo = Some(value);
                    }
                    "CodEORI" => {
                        ana.anagrafica.get_or_insert_with(Default::default).cod_eori = Some(value);
                    }
                    "AlboProfessionale" => ana.albo_professionale = Some(value),
                    "ProvinciaAlbo" => ana.provincia_albo = Some(value),
                    "NumeroIscrizioneAlbo" => ana.numero_iscrizione_albo = Some(value),
                    "DataIscrizioneAlbo" => {
                        ana.data_iscrizione_albo = Some(parse_date("DataIscrizioneAlbo", text)?);
                    }
                    "RegimeFiscale" => ana.regime_fiscale = Some(value),
                    "NumeroLicenzaGuida" => ana.numero_licenza_guida = Some(value),
                    _ => {}
                }
            }
            return Ok(());
        }

        // -- Address blocks --------------------------------------------------
        if self.has("Sede") || self.has("StabileOrganizzazione") || self.has("IndirizzoResa") {
            let value = text.to_string();
            if let Some(sede) = self.sede_mut() {
                match leaf {
                    "Indirizzo" => sede.indirizzo = Some(value),
                    "NumeroCivico" => sede.numero_civico = Some(value),
                    "CAP" => sede.cap = Some(value),
                    "Comune" => sede.comune = Some(value),
                    "Provincia" => sede.provincia = Some(value),
                    "Nazione" => sede.nazione = Some(value),
                    _ => {}
                }
            }
            return Ok(());
        }

        // -- 1.2.4 IscrizioneREA / 1.2.5 Contatti ---------------------------
        if self.has("IscrizioneREA") {
            let ced = self
                .doc
                .header
                .cedente_prestatore
                .get_or_insert_with(Default::default);
            let rea = ced.iscrizione_rea.get_or_insert_with(Default::default);
            match leaf {
                "Ufficio" => rea.ufficio = Some(text.to_string()),
                "NumeroREA" => rea.numero_rea = Some(text.to_string()),
                "CapitaleSociale" => {
                    rea.capitale_sociale = Some(parse_decimal("CapitaleSociale", text)?);
                }
                "SocioUnico" => rea.socio_unico = Some(text.to_string()),
                "StatoLiquidazione" => rea.stato_liquidazione = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if self.has("Contatti") && self.has("CedentePrestatore") {
            let ced = self
                .doc
                .header
                .cedente_prestatore
                .get_or_insert_with(Default::default);
            let contatti = ced.contatti.get_or_insert_with(Default::default);
            match leaf {
                "Telefono" => contatti.telefono = Some(text.to_string()),
                "Fax" => contatti.fax = Some(text.to_string()),
                "Email" => contatti.email = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if leaf == "RiferimentoAmministrazione" && self.has("CedentePrestatore") {
            let ced = self
                .doc
                .header
                .cedente_prestatore
                .get_or_insert_with(Default::default);
            ced.riferimento_amministrazione = Some(text.to_string());
            return Ok(());
        }
        if leaf == "SoggettoEmittente" {
            self.doc.header.soggetto_emittente = Some(text.to_string());
            return Ok(());
        }

        // -- Body blocks, innermost accumulators first ----------------------
        if let Some(art) = self.current_articolo.as_mut() {
            match leaf {
                "CodiceTipo" => art.codice_tipo = Some(text.to_string()),
                "CodiceValore" => art.codice_valore = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if let Some(dato) = self.current_altri_dati.as_mut() {
            match leaf {
                "TipoDato" => dato.tipo_dato = Some(text.to_string()),
                "RiferimentoTesto" => dato.riferimento_testo = Some(text.to_string()),
                "RiferimentoNumero" => {
                    dato.riferimento_numero = Some(parse_decimal("RiferimentoNumero", text)?);
                }
                "RiferimentoData" => {
                    dato.riferimento_data = Some(parse_date("RiferimentoData", text)?);
                }
                _ => {}
            }
            return Ok(());
        }
        if let Some(sconto) = self.current_sconto.as_mut() {
            match leaf {
                "Tipo" => sconto.tipo = Some(text.to_string()),
                "Percentuale" => sconto.percentuale = Some(parse_decimal("Percentuale", text)?),
                "Importo" => sconto.importo = Some(parse_decimal("Importo", text)?),
                _ => {}
            }
            return Ok(());
        }
        if let Some(line) = self.current_line.as_mut() {
            match leaf {
                "NumeroLinea" => line.numero_linea = Some(parse_u32("NumeroLinea", text)?),
                "TipoCessionePrestazione" => {
                    line.tipo_cessione_prestazione = Some(text.to_string());
                }
                "Descrizione" => line.descrizione = Some(text.to_string()),
                "Quantita" => line.quantita = Some(parse_decimal("Quantita", text)?),
                "UnitaMisura" => line.unita_misura = Some(text.to_string()),
                "DataInizioPeriodo" => {
                    line.data_inizio_periodo = Some(parse_date("DataInizioPeriodo", text)?);
                }
                "DataFinePeriodo" => {
                    line.data_fine_periodo = Some(parse_date("DataFinePeriodo", text)?);
                }
                "PrezzoUnitario" => {
                    line.prezzo_unitario = Some(parse_decimal("PrezzoUnitario", text)?);
                }
                "PrezzoTotale" => line.prezzo_totale = Some(parse_decimal("PrezzoTotale", text)?),
                "AliquotaIVA" => line.aliquota_iva = Some(parse_decimal("AliquotaIVA", text)?),
                "Ritenuta" => line.ritenuta = Some(text.to_string()),
                "Natura" => line.natura = Some(text.to_string()),
                "RiferimentoAmministrazione" => {
                    line.riferimento_amministrazione = Some(text.to_string());
                }
                _ => {}
            }
            return Ok(());
        }
        if let Some(summary) = self.current_summary.as_mut() {
            match leaf {
                "AliquotaIVA" => summary.aliquota_iva = Some(parse_decimal("AliquotaIVA", text)?),
                "Natura" => summary.natura = Some(text.to_string()),
                "SpeseAccessorie" => {
                    summary.spese_accessorie = Some(parse_decimal("SpeseAccessorie", text)?);
                }
                "Arrotondamento" => {
                    summary.arrotondamento = Some(parse_decimal("Arrotondamento", text)?);
                }
                "ImponibileImporto" => {
                    summary.imponibile_importo = Some(parse_decimal("ImponibileImporto", text)?);
                }
                "Imposta" => summary.imposta = Some(parse_decimal("Imposta", text)?),
                "EsigibilitaIVA" => summary.esigibilita_iva = Some(text.to_string()),
                "RiferimentoNormativo" => summary.riferimento_normativo = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if let Some(rit) = self.current_ritenuta.as_mut() {
            match leaf {
                "TipoRitenuta" => rit.tipo_ritenuta = Some(text.to_string()),
                "ImportoRitenuta" => {
                    rit.importo_ritenuta = Some(parse_decimal("ImportoRitenuta", text)?);
                }
                "AliquotaRitenuta" => {
                    rit.aliquota_ritenuta = Some(parse_decimal("AliquotaRitenuta", text)?);
                }
                "CausalePagamento" => rit.causale_pagamento = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if let Some(cassa) = self.current_cassa.as_mut() {
            match leaf {
                "TipoCassa" => cassa.tipo_cassa = Some(text.to_string()),
                "AlCassa" => cassa.al_cassa = Some(parse_decimal("AlCassa", text)?),
                "ImportoContributoCassa" => {
                    cassa.importo_contributo_cassa =
                        Some(parse_decimal("ImportoContributoCassa", text)?);
                }
                "ImponibileCassa" => {
                    cassa.imponibile_cassa = Some(parse_decimal("ImponibileCassa", text)?);
                }
                "AliquotaIVA" => cassa.aliquota_iva = Some(parse_decimal("AliquotaIVA", text)?),
                "Ritenuta" => cassa.ritenuta = Some(text.to_string()),
                "Natura" => cassa.natura = Some(text.to_string()),
                "RiferimentoAmministrazione" => {
                    cassa.riferimento_amministrazione = Some(text.to_string());
                }
                _ => {}
            }
            return Ok(());
        }
        if let Some(related) = self.current_related.as_mut() {
            match leaf {
                "RiferimentoNumeroLinea" => {
                    related
                        .riferimento_numero_linea
                        .push(parse_u32("RiferimentoNumeroLinea", text)?);
                }
                "IdDocumento" => related.id_documento = Some(text.to_string()),
                "Data" => related.data = Some(parse_date("Data", text)?),
                "NumItem" => related.num_item = Some(text.to_string()),
                "CodiceCommessaConvenzione" => {
                    related.codice_commessa_convenzione = Some(text.to_string());
                }
                "CodiceCUP" => related.codice_cup = Some(text.to_string()),
                "CodiceCIG" => related.codice_cig = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if let Some(ddt) = self.current_ddt.as_mut() {
            match leaf {
                "NumeroDDT" => ddt.numero_ddt = Some(text.to_string()),
                "DataDDT" => ddt.data_ddt = Some(parse_date("DataDDT", text)?),
                "RiferimentoNumeroLinea" => {
                    ddt.riferimento_numero_linea
                        .push(parse_u32("RiferimentoNumeroLinea", text)?);
                }
                _ => {}
            }
            return Ok(());
        }
        if let Some(detail) = self.current_payment_detail.as_mut() {
            match leaf {
                "Beneficiario" => detail.beneficiario = Some(text.to_string()),
                "ModalitaPagamento" => detail.modalita_pagamento = Some(text.to_string()),
                "DataRiferimentoTerminiPagamento" => {
                    detail.data_riferimento_termini_pagamento =
                        Some(parse_date("DataRiferimentoTerminiPagamento", text)?);
                }
                "GiorniTerminiPagamento" => {
                    detail.giorni_termini_pagamento =
                        Some(parse_u32("GiorniTerminiPagamento", text)?);
                }
                "DataScadenzaPagamento" => {
                    detail.data_scadenza_pagamento =
                        Some(parse_date("DataScadenzaPagamento", text)?);
                }
                "ImportoPagamento" => {
                    detail.importo_pagamento = Some(parse_decimal("ImportoPagamento", text)?);
                }
                "CodUfficioPostale" => detail.cod_ufficio_postale = Some(text.to_string()),
                "CognomeQuietanzante" => detail.cognome_quietanzante = Some(text.to_string()),
                "NomeQuietanzante" => detail.nome_quietanzante = Some(text.to_string()),
                "CFQuietanzante" => detail.cf_quietanzante = Some(text.to_string()),
                "TitoloQuietanzante" => detail.titolo_quietanzante = Some(text.to_string()),
                "IstitutoFinanziario" => detail.istituto_finanziario = Some(text.to_string()),
                "IBAN" => detail.iban = Some(text.to_string()),
                "ABI" => detail.abi = Some(text.to_string()),
                "CAB" => detail.cab = Some(text.to_string()),
                "BIC" => detail.bic = Some(text.to_string()),
                "ScontoPagamentoAnticipato" => {
                    detail.sconto_pagamento_anticipato =
                        Some(parse_decimal("ScontoPagamentoAnticipato", text)?);
                }
                "DataLimitePagamentoAnticipato" => {
                    detail.data_limite_pagamento_anticipato =
                        Some(parse_date("DataLimitePagamentoAnticipato", text)?);
                }
                "PenalitaPagamentiRitardati" => {
                    detail.penalita_pagamenti_ritardati =
                        Some(parse_decimal("PenalitaPagamentiRitardati", text)?);
                }
                "DataDecorrenzaPenale" => {
                    detail.data_decorrenza_penale = Some(parse_date("DataDecorrenzaPenale", text)?);
                }
                "CodicePagamento" => detail.codice_pagamento = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if let Some(payment) = self.current_payment.as_mut() {
            if leaf == "CondizioniPagamento" {
                payment.condizioni_pagamento = Some(text.to_string());
            }
            return Ok(());
        }
        if let Some(att) = self.current_allegato.as_mut() {
            match leaf {
                "NomeAttachment" => att.nome_attachment = Some(text.to_string()),
                "AlgoritmoCompressione" => att.algoritmo_compressione = Some(text.to_string()),
                "FormatoAttachment" => att.formato_attachment = Some(text.to_string()),
                "DescrizioneAttachment" => att.descrizione_attachment = Some(text.to_string()),
                "Attachment" => att.attachment = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }

        // -- Remaining body singletons --------------------------------------
        let in_trasporto = self.has("DatiTrasporto");
        let in_veicoli = self.has("DatiVeicoli");
        let in_bollo = self.has("DatiBollo");
        let in_principale = self.has("FatturaPrincipale");
        let in_sal = self.has("DatiSAL");
        let in_dgd = self.has("DatiGeneraliDocumento");
        let Some(body) = self.current_body.as_mut() else {
            return Ok(());
        };

        if in_trasporto {
            let trasporto = body
                .dati_generali
                .dati_trasporto
                .get_or_insert_with(Default::default);
            match leaf {
                "MezzoTrasporto" => trasporto.mezzo_trasporto = Some(text.to_string()),
                "CausaleTrasporto" => trasporto.causale_trasporto = Some(text.to_string()),
                "NumeroColli" => trasporto.numero_colli = Some(parse_u32("NumeroColli", text)?),
                "Descrizione" => trasporto.descrizione = Some(text.to_string()),
                "UnitaMisuraPeso" => trasporto.unita_misura_peso = Some(text.to_string()),
                "PesoLordo" => trasporto.peso_lordo = Some(parse_decimal("PesoLordo", text)?),
                "PesoNetto" => trasporto.peso_netto = Some(parse_decimal("PesoNetto", text)?),
                "DataOraRitiro" => trasporto.data_ora_ritiro = parse_datetime(text),
                "DataInizioTrasporto" => {
                    trasporto.data_inizio_trasporto = Some(parse_date("DataInizioTrasporto", text)?);
                }
                "TipoResa" => trasporto.tipo_resa = Some(text.to_string()),
                "DataOraConsegna" => trasporto.data_ora_consegna = parse_datetime(text),
                _ => {}
            }
            return Ok(());
        }
        if in_veicoli {
            let veicoli = body.dati_veicoli.get_or_insert_with(Default::default);
            match leaf {
                "Data" => veicoli.data = Some(parse_date("Data", text)?),
                "TotalePercorso" => veicoli.totale_percorso = Some(text.to_string()),
                _ => {}
            }
            return Ok(());
        }
        if in_principale {
            let fp = body
                .dati_generali
                .fattura_principale
                .get_or_insert_with(Default::default);
            match leaf {
                "NumeroFatturaPrincipale" => {
                    fp.numero_fattura_principale = Some(text.to_string());
                }
                "DataFatturaPrincipale" => {
                    fp.data_fattura_principale = Some(parse_date("DataFatturaPrincipale", text)?);
                }
                _ => {}
            }
            return Ok(());
        }
        if in_sal && leaf == "RiferimentoFase" {
            body.dati_generali
                .dati_sal
                .push(parse_u32("RiferimentoFase", text)?);
            return Ok(());
        }
        if in_dgd {
            if in_bollo {
                let bollo = body
                    .dati_generali
                    .dati_generali_documento
                    .dati_bollo
                    .get_or_insert_with(Default::default);
                match leaf {
                    "BolloVirtuale" => bollo.bollo_virtuale = Some(text.to_string()),
                    "ImportoBollo" => {
                        bollo.importo_bollo = Some(parse_decimal("ImportoBollo", text)?);
                    }
                    _ => {}
                }
                return Ok(());
            }
            let dgd = &mut body.dati_generali.dati_generali_documento;
            match leaf {
                "TipoDocumento" => dgd.tipo_documento = Some(text.to_string()),
                "Divisa" => dgd.divisa = Some(text.to_string()),
                "Data" => dgd.data = Some(parse_date("Data", text)?),
                "Numero" => dgd.numero = Some(text.to_string()),
                "ImportoTotaleDocumento" => {
                    dgd.importo_totale_documento =
                        Some(parse_decimal("ImportoTotaleDocumento", text)?);
                }
                "Arrotondamento" => {
                    dgd.arrotondamento = Some(parse_decimal("Arrotondamento", text)?);
                }
                "Causale" => dgd.causale.push(text.to_string()),
                "Art73" => dgd.art73 = Some(text.to_string()),
                _ => {}
            }
        }
        Ok(())
    }
}
