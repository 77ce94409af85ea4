//! Partner resolution: map schema identity blocks onto ledger partners,
//! creating missing ones and flagging identity conflicts.

use crate::core::{FatturaError, Inconsistencies, PartnerId};
use crate::ledger::{commercial_partner, CodeTables, Ledger, Partner};
use crate::schema::{CedentePrestatore, CessionarioCommittente, DatiAnagrafici, DatiTrasporto, Sede};

/// Build the ledger VAT number from a country-qualified fiscal id.
///
/// Domestic codes are zero-padded to 11 digits so that "IT" + "1234567"
/// and "IT00001234567" resolve to the same partner.
pub fn normalize_vat(id_paese: &str, id_codice: &str, domestic_country: &str) -> String {
    if id_paese.eq_ignore_ascii_case(domestic_country) {
        format!("{}{:0>11}", id_paese.to_uppercase(), id_codice)
    } else {
        format!("{id_paese}{id_codice}")
    }
}

/// Resolve an identity block to the commercial partner it belongs to,
/// creating a new partner when nothing matches.
///
/// Search order: exact VAT, then fiscal code. Matches spread over more
/// than one commercial group are a hard error; a single group wins and
/// declared-vs-stored name differences are logged without overwriting.
pub fn resolve_partner<L: Ledger>(
    ledger: &mut L,
    anagrafici: Option<&DatiAnagrafici>,
    domestic_country: &str,
    tables: &CodeTables,
    log: &mut Inconsistencies,
) -> Result<Option<PartnerId>, FatturaError> {
    let Some(anagrafici) = anagrafici else {
        return Ok(None);
    };

    let fiscal_code = anagrafici.codice_fiscale.clone();
    let vat = anagrafici.id_fiscale_iva.as_ref().and_then(|id| {
        let paese = id.id_paese.as_deref()?;
        let codice = id.id_codice.as_deref().unwrap_or("0");
        Some(normalize_vat(paese, codice, domestic_country))
    });

    let mut matches = Vec::new();
    if let Some(vat) = vat.as_deref() {
        matches = ledger.search_partners_by_vat(vat);
    }
    if matches.is_empty() {
        if let Some(cf) = fiscal_code.as_deref() {
            matches = ledger.search_partners_by_fiscal_code(cf);
        }
    }

    if !matches.is_empty() {
        let mut commercial = None;
        for id in &matches {
            let group = commercial_partner(ledger, *id);
            match commercial {
                Some(existing) if existing != group => {
                    return Err(FatturaError::AmbiguousPartner {
                        vat: vat.unwrap_or_default(),
                        fiscal_code: fiscal_code.unwrap_or_default(),
                    });
                }
                _ => commercial = Some(group),
            }
        }
        let commercial = commercial.expect("matches is non-empty");
        check_declared_names(ledger, commercial, anagrafici, log);
        return Ok(Some(commercial));
    }

    // Nothing matched: create. A declared country must resolve, because a
    // partner without a valid country cannot enter the ledger.
    let mut country = None;
    if let Some(id) = &anagrafici.id_fiscale_iva {
        if let Some(code) = id.id_paese.as_deref() {
            if !tables.countries.contains(code) {
                return Err(FatturaError::UnknownCode {
                    table: "country",
                    code: code.to_string(),
                });
            }
            country = Some(code.to_uppercase());
        }
    }

    let ana = anagrafici.anagrafica.as_ref();
    let denominazione = ana.and_then(|a| a.denominazione.clone()).filter(|d| !d.is_empty());
    let partner = Partner {
        name: anagrafici.display_name().unwrap_or_default(),
        firstname: ana.and_then(|a| a.nome.clone()),
        lastname: ana.and_then(|a| a.cognome.clone()),
        is_company: denominazione.is_some(),
        vat,
        fiscal_code,
        eori_code: ana.and_then(|a| a.cod_eori.clone()),
        country,
        ..Default::default()
    };
    Ok(Some(ledger.create_partner(partner)))
}

fn check_declared_names<L: Ledger>(
    ledger: &L,
    partner_id: PartnerId,
    anagrafici: &DatiAnagrafici,
    log: &mut Inconsistencies,
) {
    let Some(partner) = ledger.partner(partner_id) else {
        return;
    };
    let Some(ana) = anagrafici.anagrafica.as_ref() else {
        return;
    };
    if let Some(den) = ana.denominazione.as_deref() {
        if !den.is_empty() && partner.name != den {
            log.push(format!(
                "Company Name field contains '{den}'. Your System contains '{}'",
                partner.name
            ));
        }
    }
    if let Some(nome) = ana.nome.as_deref() {
        if !nome.is_empty() && partner.firstname.as_deref() != Some(nome) {
            log.push(format!(
                "Name field contains '{nome}'. Your System contains '{}'",
                partner.firstname.as_deref().unwrap_or("")
            ));
        }
    }
    if let Some(cognome) = ana.cognome.as_deref() {
        if !cognome.is_empty() && partner.lastname.as_deref() != Some(cognome) {
            log.push(format!(
                "Surname field contains '{cognome}'. Your System contains '{}'",
                partner.lastname.as_deref().unwrap_or("")
            ));
        }
    }
}

fn apply_address(partner: &mut Partner, sede: &Sede, tables: &CodeTables, log: &mut Inconsistencies) {
    partner.street = sede.indirizzo.clone();
    partner.zip = sede.cap.clone();
    partner.city = sede.comune.clone();
    if let Some(provincia) = sede.provincia.as_deref() {
        if tables.provinces.contains(provincia) {
            partner.province = Some(provincia.to_string());
        } else {
            log.push(format!("Province ( {provincia} ) not present in your system"));
        }
    }
}

/// Resolve the supplier (CedentePrestatore), then refresh its address,
/// professional-register, REA, fiscal-regime and contact data unless the
/// partner opted out of contact updates.
pub fn resolve_supplier<L: Ledger>(
    ledger: &mut L,
    cedente: &CedentePrestatore,
    domestic_country: &str,
    tables: &CodeTables,
    log: &mut Inconsistencies,
) -> Result<Option<PartnerId>, FatturaError> {
    let Some(partner_id) = resolve_partner(
        ledger,
        cedente.dati_anagrafici.as_ref(),
        domestic_country,
        tables,
        log,
    )?
    else {
        return Ok(None);
    };

    let Some(mut partner) = ledger.partner(partner_id) else {
        return Err(FatturaError::Dangling {
            entity: "partner",
            id: partner_id.0,
        });
    };
    if partner.no_contact_update {
        return Ok(Some(partner_id));
    }

    if let Some(sede) = &cedente.sede {
        apply_address(&mut partner, sede, tables, log);
    }

    if let Some(anagrafici) = &cedente.dati_anagrafici {
        partner.register = anagrafici.albo_professionale.clone();
        if let Some(provincia_albo) = anagrafici.provincia_albo.as_deref() {
            if tables.provinces.contains(provincia_albo) {
                partner.register_province = Some(provincia_albo.to_string());
            } else {
                log.push(format!(
                    "Register Province ( {provincia_albo} ) not present in your system"
                ));
            }
        }
        partner.register_code = anagrafici.numero_iscrizione_albo.clone();
        partner.register_date = anagrafici.data_iscrizione_albo;

        if let Some(regime) = anagrafici.regime_fiscale.as_deref() {
            if !tables.fiscal_regimes.contains(regime) {
                return Err(FatturaError::UnknownCode {
                    table: "fiscal regime",
                    code: regime.to_string(),
                });
            }
            partner.fiscal_regime = Some(regime.to_string());
        }
    }

    if let Some(rea) = &cedente.iscrizione_rea {
        if let Some(ufficio) = rea.ufficio.as_deref() {
            if tables.provinces.contains(ufficio) {
                partner.rea_office = Some(ufficio.to_string());
            } else {
                log.push(format!(
                    "REA Office Province Code ( {ufficio} ) not present in your system"
                ));
            }
        }
        if let Some(rea_code) = rea.numero_rea.as_deref() {
            let duplicates = ledger.search_partners_by_rea_code(rea_code, partner_id);
            if duplicates.is_empty() {
                partner.rea_code = Some(rea_code.to_string());
            } else {
                let names: Vec<String> = duplicates
                    .iter()
                    .filter_map(|id| ledger.partner(*id).map(|p| p.name))
                    .collect();
                log.push(format!(
                    "Current invoice is from {} with REA Code {rea_code}. Yet it seems \
                     that partners {} have the same REA Code. This code should be \
                     unique; please fix it.",
                    partner.name,
                    names.join(", ")
                ));
            }
        }
        partner.rea_capital = rea.capitale_sociale;
        partner.rea_member_type = rea.socio_unico.clone();
        partner.rea_liquidation_state = rea.stato_liquidazione.clone();
    }

    if let Some(contatti) = &cedente.contatti {
        partner.phone = contatti.telefono.clone();
        partner.email = contatti.email.clone();
    }

    ledger.write_partner(partner);
    Ok(Some(partner_id))
}

/// Resolve the customer (CessionarioCommittente) and refresh its address.
pub fn resolve_customer<L: Ledger>(
    ledger: &mut L,
    cessionario: &CessionarioCommittente,
    domestic_country: &str,
    tables: &CodeTables,
    log: &mut Inconsistencies,
) -> Result<Option<PartnerId>, FatturaError> {
    let Some(partner_id) = resolve_partner(
        ledger,
        cessionario.dati_anagrafici.as_ref(),
        domestic_country,
        tables,
        log,
    )?
    else {
        return Ok(None);
    };

    let Some(mut partner) = ledger.partner(partner_id) else {
        return Err(FatturaError::Dangling {
            entity: "partner",
            id: partner_id.0,
        });
    };
    if !partner.no_contact_update {
        if let Some(sede) = &cessionario.sede {
            apply_address(&mut partner, sede, tables, log);
        }
        ledger.write_partner(partner);
    }
    Ok(Some(partner_id))
}

/// Resolve the carrier from the transport block, refreshing the driving
/// licence number.
pub fn resolve_carrier<L: Ledger>(
    ledger: &mut L,
    trasporto: &DatiTrasporto,
    domestic_country: &str,
    tables: &CodeTables,
    log: &mut Inconsistencies,
) -> Result<Option<PartnerId>, FatturaError> {
    let Some(vettore) = trasporto.dati_anagrafici_vettore.as_ref() else {
        return Ok(None);
    };
    let Some(partner_id) = resolve_partner(ledger, Some(vettore), domestic_country, tables, log)?
    else {
        return Ok(None);
    };
    if let Some(mut partner) = ledger.partner(partner_id) {
        if !partner.no_contact_update {
            partner.license_number = vettore.numero_licenza_guida.clone();
            ledger.write_partner(partner);
        }
    }
    Ok(Some(partner_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::schema::{Anagrafica, IdFiscale};

    fn anagrafici(paese: &str, codice: &str, name: &str) -> DatiAnagrafici {
        DatiAnagrafici {
            id_fiscale_iva: Some(IdFiscale {
                id_paese: Some(paese.into()),
                id_codice: Some(codice.into()),
            }),
            anagrafica: Some(Anagrafica {
                denominazione: Some(name.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn domestic_vat_is_zero_padded() {
        assert_eq!(normalize_vat("IT", "1234567", "IT"), "IT00001234567");
        assert_eq!(normalize_vat("IT", "01234567890", "IT"), "IT01234567890");
        assert_eq!(normalize_vat("FR", "123", "IT"), "FR123");
    }

    #[test]
    fn creates_missing_partner_with_company_flag() {
        let mut ledger = MemoryLedger::new();
        let tables = CodeTables::italian_defaults();
        let mut log = Inconsistencies::new();
        let id = resolve_partner(
            &mut ledger,
            Some(&anagrafici("IT", "1234567", "Rossi SRL")),
            "IT",
            &tables,
            &mut log,
        )
        .unwrap()
        .unwrap();
        let partner = ledger.partner(id).unwrap();
        assert!(partner.is_company);
        assert_eq!(partner.vat.as_deref(), Some("IT00001234567"));
        assert!(log.is_empty());
    }

    #[test]
    fn unknown_country_is_fatal() {
        let mut ledger = MemoryLedger::new();
        let tables = CodeTables::italian_defaults();
        let mut log = Inconsistencies::new();
        let err = resolve_partner(
            &mut ledger,
            Some(&anagrafici("XX", "1", "Ghost")),
            "IT",
            &tables,
            &mut log,
        )
        .unwrap_err();
        assert!(matches!(err, FatturaError::UnknownCode { table: "country", .. }));
    }

    #[test]
    fn ambiguous_commercial_groups_are_fatal() {
        let mut ledger = MemoryLedger::new();
        let tables = CodeTables::italian_defaults();
        let group_a = ledger.create_partner(Partner {
            name: "Group A".into(),
            ..Default::default()
        });
        let group_b = ledger.create_partner(Partner {
            name: "Group B".into(),
            ..Default::default()
        });
        ledger.create_partner(Partner {
            name: "Contact A".into(),
            vat: Some("IT00001234567".into()),
            commercial_parent: Some(group_a),
            ..Default::default()
        });
        ledger.create_partner(Partner {
            name: "Contact B".into(),
            vat: Some("IT00001234567".into()),
            commercial_parent: Some(group_b),
            ..Default::default()
        });

        let mut log = Inconsistencies::new();
        let err = resolve_partner(
            &mut ledger,
            Some(&anagrafici("IT", "1234567", "Whoever")),
            "IT",
            &tables,
            &mut log,
        )
        .unwrap_err();
        assert!(matches!(err, FatturaError::AmbiguousPartner { .. }));
    }

    #[test]
    fn name_mismatch_is_advisory_not_overwrite() {
        let mut ledger = MemoryLedger::new();
        let tables = CodeTables::italian_defaults();
        ledger.create_partner(Partner {
            name: "Old Name SPA".into(),
            vat: Some("IT00001234567".into()),
            ..Default::default()
        });
        let mut log = Inconsistencies::new();
        let id = resolve_partner(
            &mut ledger,
            Some(&anagrafici("IT", "1234567", "New Name SPA")),
            "IT",
            &tables,
            &mut log,
        )
        .unwrap()
        .unwrap();
        assert_eq!(ledger.partner(id).unwrap().name, "Old Name SPA");
        assert_eq!(log.len(), 1);
        assert!(log.iter().next().unwrap().contains("New Name SPA"));
    }
}
