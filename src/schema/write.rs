use chrono::{NaiveDate, NaiveDateTime};

use super::types::*;
use super::xml::{XmlResult, XmlWriter};
use crate::core::FatturaError;

const FATTURAPA_NS: &str = "http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2";

/// Serialize a document tree to FatturaPA XML.
///
/// Element order follows the XSD sequence; absent optionals are omitted
/// entirely rather than written empty.
pub fn write(doc: &FatturaElettronica) -> XmlResult {
    let versione = doc
        .header
        .dati_trasmissione
        .as_ref()
        .and_then(|t| t.formato_trasmissione.as_deref())
        .unwrap_or("FPR12");

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs(
        "p:FatturaElettronica",
        &[("versione", versione), ("xmlns:p", FATTURAPA_NS)],
    )?;

    write_header(&mut w, &doc.header)?;
    for body in &doc.bodies {
        write_body(&mut w, body)?;
    }

    w.end_element("p:FatturaElettronica")?;
    w.into_string()
}

fn fmt_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn fmt_datetime(d: &NaiveDateTime) -> String {
    d.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn opt_date_element(
    w: &mut XmlWriter,
    name: &str,
    date: Option<&NaiveDate>,
) -> Result<(), FatturaError> {
    if let Some(d) = date {
        w.text_element(name, &fmt_date(d))?;
    }
    Ok(())
}

fn write_header(w: &mut XmlWriter, header: &FatturaElettronicaHeader) -> Result<(), FatturaError> {
    w.start_element("FatturaElettronicaHeader")?;

    if let Some(tras) = &header.dati_trasmissione {
        w.start_element("DatiTrasmissione")?;
        if let Some(id) = &tras.id_trasmittente {
            write_id_fiscale(w, "IdTrasmittente", id)?;
        }
        w.opt_text_element("ProgressivoInvio", tras.progressivo_invio.as_deref())?;
        w.opt_text_element("FormatoTrasmissione", tras.formato_trasmissione.as_deref())?;
        w.opt_text_element("CodiceDestinatario", tras.codice_destinatario.as_deref())?;
        if let Some(contatti) = &tras.contatti_trasmittente {
            w.start_element("ContattiTrasmittente")?;
            w.opt_text_element("Telefono", contatti.telefono.as_deref())?;
            w.opt_text_element("Email", contatti.email.as_deref())?;
            w.end_element("ContattiTrasmittente")?;
        }
        w.opt_text_element("PECDestinatario", tras.pec_destinatario.as_deref())?;
        w.end_element("DatiTrasmissione")?;
    }

    if let Some(ced) = &header.cedente_prestatore {
        w.start_element("CedentePrestatore")?;
        if let Some(da) = &ced.dati_anagrafici {
            write_dati_anagrafici(w, "DatiAnagrafici", da)?;
        }
        if let Some(sede) = &ced.sede {
            write_sede(w, "Sede", sede)?;
        }
        if let Some(stabile) = &ced.stabile_organizzazione {
            write_sede(w, "StabileOrganizzazione", stabile)?;
        }
        if let Some(rea) = &ced.iscrizione_rea {
            w.start_element("IscrizioneREA")?;
            w.opt_text_element("Ufficio", rea.ufficio.as_deref())?;
            w.opt_text_element("NumeroREA", rea.numero_rea.as_deref())?;
            w.opt_decimal_element("CapitaleSociale", rea.capitale_sociale)?;
            w.opt_text_element("SocioUnico", rea.socio_unico.as_deref())?;
            w.opt_text_element("StatoLiquidazione", rea.stato_liquidazione.as_deref())?;
            w.end_element("IscrizioneREA")?;
        }
        if let Some(contatti) = &ced.contatti {
            w.start_element("Contatti")?;
            w.opt_text_element("Telefono", contatti.telefono.as_deref())?;
            w.opt_text_element("Fax", contatti.fax.as_deref())?;
            w.opt_text_element("Email", contatti.email.as_deref())?;
            w.end_element("Contatti")?;
        }
        w.opt_text_element(
            "RiferimentoAmministrazione",
            ced.riferimento_amministrazione.as_deref(),
        )?;
        w.end_element("CedentePrestatore")?;
    }

    if let Some(rapp) = &header.rappresentante_fiscale {
        w.start_element("RappresentanteFiscale")?;
        if let Some(da) = &rapp.dati_anagrafici {
            write_dati_anagrafici(w, "DatiAnagrafici", da)?;
        }
        w.end_element("RappresentanteFiscale")?;
    }

    if let Some(cess) = &header.cessionario_committente {
        w.start_element("CessionarioCommittente")?;
        if let Some(da) = &cess.dati_anagrafici {
            write_dati_anagrafici(w, "DatiAnagrafici", da)?;
        }
        if let Some(sede) = &cess.sede {
            write_sede(w, "Sede", sede)?;
        }
        if let Some(stabile) = &cess.stabile_organizzazione {
            write_sede(w, "StabileOrganizzazione", stabile)?;
        }
        w.end_element("CessionarioCommittente")?;
    }

    if let Some(terzo) = &header.terzo_intermediario {
        w.start_element("TerzoIntermediarioOSoggettoEmittente")?;
        if let Some(da) = &terzo.dati_anagrafici {
            write_dati_anagrafici(w, "DatiAnagrafici", da)?;
        }
        w.end_element("TerzoIntermediarioOSoggettoEmittente")?;
    }

    w.opt_text_element("SoggettoEmittente", header.soggetto_emittente.as_deref())?;
    w.end_element("FatturaElettronicaHeader")?;
    Ok(())
}

fn write_id_fiscale(w: &mut XmlWriter, name: &str, id: &IdFiscale) -> Result<(), FatturaError> {
    w.start_element(name)?;
    w.opt_text_element("IdPaese", id.id_paese.as_deref())?;
    w.opt_text_element("IdCodice", id.id_codice.as_deref())?;
    w.end_element(name)?;
    Ok(())
}

fn write_dati_anagrafici(
    w: &mut XmlWriter,
    name: &str,
    da: &DatiAnagrafici,
) -> Result<(), FatturaError> {
    w.start_element(name)?;
    if let Some(id) = &da.id_fiscale_iva {
        write_id_fiscale(w, "IdFiscaleIVA", id)?;
    }
    w.opt_text_element("CodiceFiscale", da.codice_fiscale.as_deref())?;
    if let Some(ana) = &da.anagrafica {
        w.start_element("Anagrafica")?;
        w.opt_text_element("Denominazione", ana.denominazione.as_deref())?;
        w.opt_text_element("Nome", ana.nome.as_deref())?;
        w.opt_text_element("Cognome", ana.cognome.as_deref())?;
        w.opt_text_element("Titolo", ana.titolo.as_deref())?;
        w.opt_text_element("CodEORI", ana.cod_eori.as_deref())?;
        w.end_element("Anagrafica")?;
    }
    w.opt_text_element("AlboProfessionale", da.albo_professionale.as_deref())?;
    w.opt_text_element("ProvinciaAlbo", da.provincia_albo.as_deref())?;
    w.opt_text_element("NumeroIscrizioneAlbo", da.numero_iscrizione_albo.as_deref())?;
    opt_date_element(w, "DataIscrizioneAlbo", da.data_iscrizione_albo.as_ref())?;
    w.opt_text_element("RegimeFiscale", da.regime_fiscale.as_deref())?;
    w.opt_text_element("NumeroLicenzaGuida", da.numero_licenza_guida.as_deref())?;
    w.end_element(name)?;
    Ok(())
}

fn write_sede(w: &mut XmlWriter, name: &str, sede: &Sede) -> Result<(), FatturaError> {
    w.start_element(name)?;
    w.opt_text_element("Indirizzo", sede.indirizzo.as_deref())?;
    w.opt_text_element("NumeroCivico", sede.numero_civico.as_deref())?;
    w.opt_text_element("CAP", sede.cap.as_deref())?;
    w.opt_text_element("Comune", sede.comune.as_deref())?;
    w.opt_text_element("Provincia", sede.provincia.as_deref())?;
    w.opt_text_element("Nazione", sede.nazione.as_deref())?;
    w.end_element(name)?;
    Ok(())
}

fn write_body(w: &mut XmlWriter, body: &FatturaElettronicaBody) -> Result<(), FatturaError> {
    w.start_element("FatturaElettronicaBody")?;
    w.start_element("DatiGenerali")?;

    let dgd = &body.dati_generali.dati_generali_documento;
    w.start_element("DatiGeneraliDocumento")?;
    w.opt_text_element("TipoDocumento", dgd.tipo_documento.as_deref())?;
    w.opt_text_element("Divisa", dgd.divisa.as_deref())?;
    opt_date_element(w, "Data", dgd.data.as_ref())?;
    w.opt_text_element("Numero", dgd.numero.as_deref())?;
    for rit in &dgd.dati_ritenuta {
        w.start_element("DatiRitenuta")?;
        w.opt_text_element("TipoRitenuta", rit.tipo_ritenuta.as_deref())?;
        w.opt_decimal_element("ImportoRitenuta", rit.importo_ritenuta)?;
        w.opt_decimal_element("AliquotaRitenuta", rit.aliquota_ritenuta)?;
        w.opt_text_element("CausalePagamento", rit.causale_pagamento.as_deref())?;
        w.end_element("DatiRitenuta")?;
    }
    if let Some(bollo) = &dgd.dati_bollo {
        w.start_element("DatiBollo")?;
        w.opt_text_element("BolloVirtuale", bollo.bollo_virtuale.as_deref())?;
        w.opt_decimal_element("ImportoBollo", bollo.importo_bollo)?;
        w.end_element("DatiBollo")?;
    }
    for cassa in &dgd.dati_cassa_previdenziale {
        w.start_element("DatiCassaPrevidenziale")?;
        w.opt_text_element("TipoCassa", cassa.tipo_cassa.as_deref())?;
        w.opt_decimal_element("AlCassa", cassa.al_cassa)?;
        w.opt_decimal_element("ImportoContributoCassa", cassa.importo_contributo_cassa)?;
        w.opt_decimal_element("ImponibileCassa", cassa.imponibile_cassa)?;
        w.opt_decimal_element("AliquotaIVA", cassa.aliquota_iva)?;
        w.opt_text_element("Ritenuta", cassa.ritenuta.as_deref())?;
        w.opt_text_element("Natura", cassa.natura.as_deref())?;
        w.opt_text_element(
            "RiferimentoAmministrazione",
            cassa.riferimento_amministrazione.as_deref(),
        )?;
        w.end_element("DatiCassaPrevidenziale")?;
    }
    for sconto in &dgd.sconto_maggiorazione {
        write_sconto(w, sconto)?;
    }
    w.opt_decimal_element("ImportoTotaleDocumento", dgd.importo_totale_documento)?;
    w.opt_decimal_element("Arrotondamento", dgd.arrotondamento)?;
    for causale in &dgd.causale {
        w.text_element("Causale", causale)?;
    }
    w.opt_text_element("Art73", dgd.art73.as_deref())?;
    w.end_element("DatiGeneraliDocumento")?;

    let generali = &body.dati_generali;
    for (name, docs) in [
        ("DatiOrdineAcquisto", &generali.dati_ordine_acquisto),
        ("DatiContratto", &generali.dati_contratto),
        ("DatiConvenzione", &generali.dati_convenzione),
        ("DatiRicezione", &generali.dati_ricezione),
        ("DatiFattureCollegate", &generali.dati_fatture_collegate),
    ] {
        for doc in docs {
            write_related(w, name, doc)?;
        }
    }
    for fase in &generali.dati_sal {
        w.start_element("DatiSAL")?;
        w.text_element("RiferimentoFase", &fase.to_string())?;
        w.end_element("DatiSAL")?;
    }
    for ddt in &generali.dati_ddt {
        w.start_element("DatiDDT")?;
        w.opt_text_element("NumeroDDT", ddt.numero_ddt.as_deref())?;
        opt_date_element(w, "DataDDT", ddt.data_ddt.as_ref())?;
        for numline in &ddt.riferimento_numero_linea {
            w.text_element("RiferimentoNumeroLinea", &numline.to_string())?;
        }
        w.end_element("DatiDDT")?;
    }
    if let Some(trasporto) = &generali.dati_trasporto {
        write_trasporto(w, trasporto)?;
    }
    if let Some(fp) = &generali.fattura_principale {
        w.start_element("FatturaPrincipale")?;
        w.opt_text_element(
            "NumeroFatturaPrincipale",
            fp.numero_fattura_principale.as_deref(),
        )?;
        opt_date_element(w, "DataFatturaPrincipale", fp.data_fattura_principale.as_ref())?;
        w.end_element("FatturaPrincipale")?;
    }
    w.end_element("DatiGenerali")?;

    w.start_element("DatiBeniServizi")?;
    for line in &body.dati_beni_servizi.dettaglio_linee {
        write_linea(w, line)?;
    }
    for summary in &body.dati_beni_servizi.dati_riepilogo {
        w.start_element("DatiRiepilogo")?;
        w.opt_decimal_element("AliquotaIVA", summary.aliquota_iva)?;
        w.opt_text_element("Natura", summary.natura.as_deref())?;
        w.opt_decimal_element("SpeseAccessorie", summary.spese_accessorie)?;
        w.opt_decimal_element("Arrotondamento", summary.arrotondamento)?;
        w.opt_decimal_element("ImponibileImporto", summary.imponibile_importo)?;
        w.opt_decimal_element("Imposta", summary.imposta)?;
        w.opt_text_element("EsigibilitaIVA", summary.esigibilita_iva.as_deref())?;
        w.opt_text_element("RiferimentoNormativo", summary.riferimento_normativo.as_deref())?;
        w.end_element("DatiRiepilogo")?;
    }
    w.end_element("DatiBeniServizi")?;

    if let Some(veicoli) = &body.dati_veicoli {
        w.start_element("DatiVeicoli")?;
        opt_date_element(w, "Data", veicoli.data.as_ref())?;
        w.opt_text_element("TotalePercorso", veicoli.totale_percorso.as_deref())?;
        w.end_element("DatiVeicoli")?;
    }

    for payment in &body.dati_pagamento {
        w.start_element("DatiPagamento")?;
        w.opt_text_element("CondizioniPagamento", payment.condizioni_pagamento.as_deref())?;
        for detail in &payment.dettaglio_pagamento {
            write_dettaglio_pagamento(w, detail)?;
        }
        w.end_element("DatiPagamento")?;
    }

    for att in &body.allegati {
        w.start_element("Allegati")?;
        w.opt_text_element("NomeAttachment", att.nome_attachment.as_deref())?;
        w.opt_text_element("AlgoritmoCompressione", att.algoritmo_compressione.as_deref())?;
        w.opt_text_element("FormatoAttachment", att.formato_attachment.as_deref())?;
        w.opt_text_element(
            "DescrizioneAttachment",
            att.descrizione_attachment.as_deref(),
        )?;
        w.opt_text_element("Attachment", att.attachment.as_deref())?;
        w.end_element("Allegati")?;
    }

    w.end_element("FatturaElettronicaBody")?;
    Ok(())
}

fn write_sconto(w: &mut XmlWriter, sconto: &ScontoMaggiorazione) -> Result<(), FatturaError> {
    w.start_element("ScontoMaggiorazione")?;
    w.opt_text_element("Tipo", sconto.tipo.as_deref())?;
    w.opt_decimal_element("Percentuale", sconto.percentuale)?;
    w.opt_decimal_element("Importo", sconto.importo)?;
    w.end_element("ScontoMaggiorazione")?;
    Ok(())
}

fn write_related(
    w: &mut XmlWriter,
    name: &str,
    doc: &DatiDocumentiCorrelati,
) -> Result<(), FatturaError> {
    w.start_element(name)?;
    for numline in &doc.riferimento_numero_linea {
        w.text_element("RiferimentoNumeroLinea", &numline.to_string())?;
    }
    w.opt_text_element("IdDocumento", doc.id_documento.as_deref())?;
    opt_date_element(w, "Data", doc.data.as_ref())?;
    w.opt_text_element("NumItem", doc.num_item.as_deref())?;
    w.opt_text_element(
        "CodiceCommessaConvenzione",
        doc.codice_commessa_convenzione.as_deref(),
    )?;
    w.opt_text_element("CodiceCUP", doc.codice_cup.as_deref())?;
    w.opt_text_element("CodiceCIG", doc.codice_cig.as_deref())?;
    w.end_element(name)?;
    Ok(())
}

fn write_trasporto(w: &mut XmlWriter, trasporto: &DatiTrasporto) -> Result<(), FatturaError> {
    w.start_element("DatiTrasporto")?;
    if let Some(vettore) = &trasporto.dati_anagrafici_vettore {
        write_dati_anagrafici(w, "DatiAnagraficiVettore", vettore)?;
    }
    w.opt_text_element("MezzoTrasporto", trasporto.mezzo_trasporto.as_deref())?;
    w.opt_text_element("CausaleTrasporto", trasporto.causale_trasporto.as_deref())?;
    if let Some(colli) = trasporto.numero_colli {
        w.text_element("NumeroColli", &colli.to_string())?;
    }
    w.opt_text_element("Descrizione", trasporto.descrizione.as_deref())?;
    w.opt_text_element("UnitaMisuraPeso", trasporto.unita_misura_peso.as_deref())?;
    w.opt_decimal_element("PesoLordo", trasporto.peso_lordo)?;
    w.opt_decimal_element("PesoNetto", trasporto.peso_netto)?;
    if let Some(dt) = &trasporto.data_ora_ritiro {
        w.text_element("DataOraRitiro", &fmt_datetime(dt))?;
    }
    opt_date_element(w, "DataInizioTrasporto", trasporto.data_inizio_trasporto.as_ref())?;
    w.opt_text_element("TipoResa", trasporto.tipo_resa.as_deref())?;
    if let Some(resa) = &trasporto.indirizzo_resa {
        write_sede(w, "IndirizzoResa", resa)?;
    }
    if let Some(dt) = &trasporto.data_ora_consegna {
        w.text_element("DataOraConsegna", &fmt_datetime(dt))?;
    }
    w.end_element("DatiTrasporto")?;
    Ok(())
}

fn write_linea(w: &mut XmlWriter, line: &DettaglioLinea) -> Result<(), FatturaError> {
    w.start_element("DettaglioLinee")?;
    if let Some(n) = line.numero_linea {
        w.text_element("NumeroLinea", &n.to_string())?;
    }
    w.opt_text_element(
        "TipoCessionePrestazione",
        line.tipo_cessione_prestazione.as_deref(),
    )?;
    for art in &line.codice_articolo {
        w.start_element("CodiceArticolo")?;
        w.opt_text_element("CodiceTipo", art.codice_tipo.as_deref())?;
        w.opt_text_element("CodiceValore", art.codice_valore.as_deref())?;
        w.end_element("CodiceArticolo")?;
    }
    w.opt_text_element("Descrizione", line.descrizione.as_deref())?;
    w.opt_decimal_element("Quantita", line.quantita)?;
    w.opt_text_element("UnitaMisura", line.unita_misura.as_deref())?;
    opt_date_element(w, "DataInizioPeriodo", line.data_inizio_periodo.as_ref())?;
    opt_date_element(w, "DataFinePeriodo", line.data_fine_periodo.as_ref())?;
    w.opt_decimal_element("PrezzoUnitario", line.prezzo_unitario)?;
    for sconto in &line.sconto_maggiorazione {
        write_sconto(w, sconto)?;
    }
    w.opt_decimal_element("PrezzoTotale", line.prezzo_totale)?;
    w.opt_decimal_element("AliquotaIVA", line.aliquota_iva)?;
    w.opt_text_element("Ritenuta", line.ritenuta.as_deref())?;
    w.opt_text_element("Natura", line.natura.as_deref())?;
    w.opt_text_element(
        "RiferimentoAmministrazione",
        line.riferimento_amministrazione.as_deref(),
    )?;
    for dato in &line.altri_dati_gestionali {
        w.start_element("AltriDatiGestionali")?;
        w.opt_text_element("TipoDato", dato.tipo_dato.as_deref())?;
        w.opt_text_element("RiferimentoTesto", dato.riferimento_testo.as_deref())?;
        w.opt_decimal_element("RiferimentoNumero", dato.riferimento_numero)?;
        opt_date_element(w, "RiferimentoData", dato.riferimento_data.as_ref())?;
        w.end_element("AltriDatiGestionali")?;
    }
    w.end_element("DettaglioLinee")?;
    Ok(())
}

fn write_dettaglio_pagamento(
    w: &mut XmlWriter,
    detail: &DettaglioPagamento,
) -> Result<(), FatturaError> {
    w.start_element("DettaglioPagamento")?;
    w.opt_text_element("Beneficiario", detail.beneficiario.as_deref())?;
    w.opt_text_element("ModalitaPagamento", detail.modalita_pagamento.as_deref())?;
    opt_date_element(
        w,
        "DataRiferimentoTerminiPagamento",
        detail.data_riferimento_termini_pagamento.as_ref(),
    )?;
    if let Some(days) = detail.giorni_termini_pagamento {
        w.text_element("GiorniTerminiPagamento", &days.to_string())?;
    }
    opt_date_element(
        w,
        "DataScadenzaPagamento",
        detail.data_scadenza_pagamento.as_ref(),
    )?;
    w.opt_decimal_element("ImportoPagamento", detail.importo_pagamento)?;
    w.opt_text_element("CodUfficioPostale", detail.cod_ufficio_postale.as_deref())?;
    w.opt_text_element("CognomeQuietanzante", detail.cognome_quietanzante.as_deref())?;
    w.opt_text_element("NomeQuietanzante", detail.nome_quietanzante.as_deref())?;
    w.opt_text_element("CFQuietanzante", detail.cf_quietanzante.as_deref())?;
    w.opt_text_element("TitoloQuietanzante", detail.titolo_quietanzante.as_deref())?;
    w.opt_text_element("IstitutoFinanziario", detail.istituto_finanziario.as_deref())?;
    w.opt_text_element("IBAN", detail.iban.as_deref())?;
    w.opt_text_element("ABI", detail.abi.as_deref())?;
    w.opt_text_element("CAB", detail.cab.as_deref())?;
    w.opt_text_element("BIC", detail.bic.as_deref())?;
    w.opt_decimal_element(
        "ScontoPagamentoAnticipato",
        detail.sconto_pagamento_anticipato,
    )?;
    opt_date_element(
        w,
        "DataLimitePagamentoAnticipato",
        detail.data_limite_pagamento_anticipato.as_ref(),
    )?;
    w.opt_decimal_element(
        "PenalitaPagamentiRitardati",
        detail.penalita_pagamenti_ritardati,
    )?;
    opt_date_element(w, "DataDecorrenzaPenale", detail.data_decorrenza_penale.as_ref())?;
    w.opt_text_element("CodicePagamento", detail.codice_pagamento.as_deref())?;
    w.end_element("DettaglioPagamento")?;
    Ok(())
}
