//! Typed binding of the FatturaPA 1.2 document tree.
//!
//! Every field the schema marks optional is an `Option`; absence of an
//! element is distinct from its presence with an empty or zero value.
//! The distinction carries business meaning on [`DettaglioLinea::quantita`]
//! (absent means "one unit", an explicit zero stays zero), on the
//! [`ScontoMaggiorazione`] members, and on [`DatiRiepilogo::arrotondamento`].
//!
//! Struct and field names follow the statutory XSD element names; this
//! module never touches the ledger model.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Root element: one header, one or more bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatturaElettronica {
    pub header: FatturaElettronicaHeader,
    pub bodies: Vec<FatturaElettronicaBody>,
}

// ---------------------------------------------------------------------------
// Header (1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatturaElettronicaHeader {
    /// 1.1 DatiTrasmissione.
    pub dati_trasmissione: Option<DatiTrasmissione>,
    /// 1.2 CedentePrestatore — the supplier/issuer.
    pub cedente_prestatore: Option<CedentePrestatore>,
    /// 1.3 RappresentanteFiscale.
    pub rappresentante_fiscale: Option<RappresentanteFiscale>,
    /// 1.4 CessionarioCommittente — the customer.
    pub cessionario_committente: Option<CessionarioCommittente>,
    /// 1.5 TerzoIntermediarioOSoggettoEmittente.
    pub terzo_intermediario: Option<TerzoIntermediario>,
    /// 1.6 SoggettoEmittente.
    pub soggetto_emittente: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiTrasmissione {
    pub id_trasmittente: Option<IdFiscale>,
    pub progressivo_invio: Option<String>,
    pub formato_trasmissione: Option<String>,
    pub codice_destinatario: Option<String>,
    pub pec_destinatario: Option<String>,
    pub contatti_trasmittente: Option<Contatti>,
}

/// Country-qualified fiscal identifier (IdPaese + IdCodice).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdFiscale {
    pub id_paese: Option<String>,
    pub id_codice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Anagrafica {
    pub denominazione: Option<String>,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub titolo: Option<String>,
    pub cod_eori: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiAnagrafici {
    pub id_fiscale_iva: Option<IdFiscale>,
    pub codice_fiscale: Option<String>,
    pub anagrafica: Option<Anagrafica>,
    pub albo_professionale: Option<String>,
    pub provincia_albo: Option<String>,
    pub numero_iscrizione_albo: Option<String>,
    pub data_iscrizione_albo: Option<NaiveDate>,
    pub regime_fiscale: Option<String>,
    /// Only populated for the carrier variant (DatiAnagraficiVettore).
    pub numero_licenza_guida: Option<String>,
}

/// Postal address block, shared by Sede, StabileOrganizzazione and
/// IndirizzoResa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sede {
    pub indirizzo: Option<String>,
    pub numero_civico: Option<String>,
    pub cap: Option<String>,
    pub comune: Option<String>,
    pub provincia: Option<String>,
    pub nazione: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IscrizioneRea {
    pub ufficio: Option<String>,
    pub numero_rea: Option<String>,
    pub capitale_sociale: Option<Decimal>,
    pub socio_unico: Option<String>,
    pub stato_liquidazione: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contatti {
    pub telefono: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CedentePrestatore {
    pub dati_anagrafici: Option<DatiAnagrafici>,
    pub sede: Option<Sede>,
    pub stabile_organizzazione: Option<Sede>,
    pub iscrizione_rea: Option<IscrizioneRea>,
    pub contatti: Option<Contatti>,
    pub riferimento_amministrazione: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RappresentanteFiscale {
    pub dati_anagrafici: Option<DatiAnagrafici>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CessionarioCommittente {
    pub dati_anagrafici: Option<DatiAnagrafici>,
    pub sede: Option<Sede>,
    pub stabile_organizzazione: Option<Sede>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerzoIntermediario {
    pub dati_anagrafici: Option<DatiAnagrafici>,
}

// ---------------------------------------------------------------------------
// Body (2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatturaElettronicaBody {
    /// 2.1 DatiGenerali.
    pub dati_generali: DatiGenerali,
    /// 2.2 DatiBeniServizi.
    pub dati_beni_servizi: DatiBeniServizi,
    /// 2.3 DatiVeicoli.
    pub dati_veicoli: Option<DatiVeicoli>,
    /// 2.4 DatiPagamento.
    pub dati_pagamento: Vec<DatiPagamento>,
    /// 2.5 Allegati.
    pub allegati: Vec<Allegato>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiGenerali {
    pub dati_generali_documento: DatiGeneraliDocumento,
    pub dati_ordine_acquisto: Vec<DatiDocumentiCorrelati>,
    pub dati_contratto: Vec<DatiDocumentiCorrelati>,
    pub dati_convenzione: Vec<DatiDocumentiCorrelati>,
    pub dati_ricezione: Vec<DatiDocumentiCorrelati>,
    pub dati_fatture_collegate: Vec<DatiDocumentiCorrelati>,
    /// 2.1.7 DatiSAL — RiferimentoFase values.
    pub dati_sal: Vec<u32>,
    pub dati_ddt: Vec<DatiDdt>,
    pub dati_trasporto: Option<DatiTrasporto>,
    pub fattura_principale: Option<FatturaPrincipale>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiGeneraliDocumento {
    pub tipo_documento: Option<String>,
    pub divisa: Option<String>,
    pub data: Option<NaiveDate>,
    pub numero: Option<String>,
    pub dati_ritenuta: Vec<DatiRitenuta>,
    pub dati_bollo: Option<DatiBollo>,
    pub dati_cassa_previdenziale: Vec<DatiCassaPrevidenziale>,
    pub sconto_maggiorazione: Vec<ScontoMaggiorazione>,
    pub importo_totale_documento: Option<Decimal>,
    pub arrotondamento: Option<Decimal>,
    pub causale: Vec<String>,
    /// "SI" when the document is issued under art. 73 DPR 633/72.
    pub art73: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiRitenuta {
    pub tipo_ritenuta: Option<String>,
    pub importo_ritenuta: Option<Decimal>,
    pub aliquota_ritenuta: Option<Decimal>,
    pub causale_pagamento: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiBollo {
    pub bollo_virtuale: Option<String>,
    pub importo_bollo: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiCassaPrevidenziale {
    pub tipo_cassa: Option<String>,
    pub al_cassa: Option<Decimal>,
    pub importo_contributo_cassa: Option<Decimal>,
    pub imponibile_cassa: Option<Decimal>,
    pub aliquota_iva: Option<Decimal>,
    pub ritenuta: Option<String>,
    pub natura: Option<String>,
    pub riferimento_amministrazione: Option<String>,
}

/// Discount (SC) or surcharge (MG) step. Percentuale and Importo are each
/// optional; an absent member is not the same as a declared zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScontoMaggiorazione {
    pub tipo: Option<String>,
    pub percentuale: Option<Decimal>,
    pub importo: Option<Decimal>,
}

/// Shared shape of DatiOrdineAcquisto, DatiContratto, DatiConvenzione,
/// DatiRicezione and DatiFattureCollegate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiDocumentiCorrelati {
    pub riferimento_numero_linea: Vec<u32>,
    pub id_documento: Option<String>,
    pub data: Option<NaiveDate>,
    pub num_item: Option<String>,
    pub codice_commessa_convenzione: Option<String>,
    pub codice_cup: Option<String>,
    pub codice_cig: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiDdt {
    pub numero_ddt: Option<String>,
    pub data_ddt: Option<NaiveDate>,
    pub riferimento_numero_linea: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiTrasporto {
    pub dati_anagrafici_vettore: Option<DatiAnagrafici>,
    pub mezzo_trasporto: Option<String>,
    pub causale_trasporto: Option<String>,
    pub numero_colli: Option<u32>,
    pub descrizione: Option<String>,
    pub unita_misura_peso: Option<String>,
    pub peso_lordo: Option<Decimal>,
    pub peso_netto: Option<Decimal>,
    pub data_ora_ritiro: Option<NaiveDateTime>,
    pub data_inizio_trasporto: Option<NaiveDate>,
    pub tipo_resa: Option<String>,
    pub indirizzo_resa: Option<Sede>,
    pub data_ora_consegna: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatturaPrincipale {
    pub numero_fattura_principale: Option<String>,
    pub data_fattura_principale: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiVeicoli {
    pub data: Option<NaiveDate>,
    pub totale_percorso: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiBeniServizi {
    pub dettaglio_linee: Vec<DettaglioLinea>,
    pub dati_riepilogo: Vec<DatiRiepilogo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DettaglioLinea {
    pub numero_linea: Option<u32>,
    pub tipo_cessione_prestazione: Option<String>,
    pub codice_articolo: Vec<CodiceArticolo>,
    pub descrizione: Option<String>,
    /// Absent quantity is not zero quantity: services are routinely
    /// invoiced without one, while an explicit 0 stays 0.
    pub quantita: Option<Decimal>,
    pub unita_misura: Option<String>,
    pub data_inizio_periodo: Option<NaiveDate>,
    pub data_fine_periodo: Option<NaiveDate>,
    pub prezzo_unitario: Option<Decimal>,
    pub sconto_maggiorazione: Vec<ScontoMaggiorazione>,
    pub prezzo_totale: Option<Decimal>,
    pub aliquota_iva: Option<Decimal>,
    pub ritenuta: Option<String>,
    pub natura: Option<String>,
    pub riferimento_amministrazione: Option<String>,
    pub altri_dati_gestionali: Vec<AltriDatiGestionali>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodiceArticolo {
    pub codice_tipo: Option<String>,
    pub codice_valore: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltriDatiGestionali {
    pub tipo_dato: Option<String>,
    pub riferimento_testo: Option<String>,
    pub riferimento_numero: Option<Decimal>,
    pub riferimento_data: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiRiepilogo {
    pub aliquota_iva: Option<Decimal>,
    pub natura: Option<String>,
    pub spese_accessorie: Option<Decimal>,
    pub arrotondamento: Option<Decimal>,
    pub imponibile_importo: Option<Decimal>,
    pub imposta: Option<Decimal>,
    pub esigibilita_iva: Option<String>,
    pub riferimento_normativo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatiPagamento {
    pub condizioni_pagamento: Option<String>,
    pub dettaglio_pagamento: Vec<DettaglioPagamento>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DettaglioPagamento {
    pub beneficiario: Option<String>,
    pub modalita_pagamento: Option<String>,
    pub data_riferimento_termini_pagamento: Option<NaiveDate>,
    pub giorni_termini_pagamento: Option<u32>,
    pub data_scadenza_pagamento: Option<NaiveDate>,
    pub importo_pagamento: Option<Decimal>,
    pub cod_ufficio_postale: Option<String>,
    pub cognome_quietanzante: Option<String>,
    pub nome_quietanzante: Option<String>,
    pub cf_quietanzante: Option<String>,
    pub titolo_quietanzante: Option<String>,
    pub istituto_finanziario: Option<String>,
    pub iban: Option<String>,
    pub abi: Option<String>,
    pub cab: Option<String>,
    pub bic: Option<String>,
    pub sconto_pagamento_anticipato: Option<Decimal>,
    pub data_limite_pagamento_anticipato: Option<NaiveDate>,
    pub penalita_pagamenti_ritardati: Option<Decimal>,
    pub data_decorrenza_penale: Option<NaiveDate>,
    pub codice_pagamento: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allegato {
    pub nome_attachment: Option<String>,
    pub algoritmo_compressione: Option<String>,
    pub formato_attachment: Option<String>,
    pub descrizione_attachment: Option<String>,
    pub attachment: Option<String>,
}

impl DatiAnagrafici {
    /// Declared display name: Denominazione for companies, Nome + Cognome
    /// for natural persons.
    pub fn display_name(&self) -> Option<String> {
        let ana = self.anagrafica.as_ref()?;
        if let Some(den) = ana.denominazione.as_deref() {
            if !den.is_empty() {
                return Some(den.to_string());
            }
        }
        match (ana.nome.as_deref(), ana.cognome.as_deref()) {
            (Some(n), Some(c)) => Some(format!("{n} {c}")),
            (Some(n), None) => Some(n.to_string()),
            (None, Some(c)) => Some(c.to_string()),
            (None, None) => None,
        }
    }
}
