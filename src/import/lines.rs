//! Line mapping: synthesize ledger invoice lines from detail lines or
//! per-rate summary blocks, at the configured detail level.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::tax::resolve_tax;
use crate::core::{
    AccountId, DetailLevel, FatturaError, Inconsistencies, InvoiceLine, LineKind, ProductId,
    TaxUse, WithholdingTaxId,
};
use crate::ledger::{CompanyConfig, Ledger, Partner};
use crate::schema::{DatiRiepilogo, DettaglioLinea, FatturaElettronicaBody};

/// Back-derive the discount percentage from the declared line total.
///
/// The declared total is the authoritative figure, so the percentage is
/// recomputed from it instead of trusting a separately declared one:
/// `(1 - (total/quantity)/unit_price) * 100`. Only defined when unit
/// price, quantity and a discount/surcharge block are all present and
/// non-zero.
pub fn derive_discount(line: &DettaglioLinea) -> Option<Decimal> {
    let unit_price = line.prezzo_unitario?;
    let quantity = line.quantita?;
    let total = line.prezzo_totale?;
    if unit_price.is_zero() || quantity.is_zero() || line.sconto_maggiorazione.is_empty() {
        return None;
    }
    let unit_from_total = total / quantity;
    Some((Decimal::ONE - unit_from_total / unit_price) * dec!(100))
}

/// Resolve the product for a detail line via its article code.
///
/// Exactly one article code with exactly one registered match wins;
/// anything ambiguous collapses to "undetermined" rather than guessing.
/// Falls back to the partner's configured default product.
pub fn resolve_line_product<L: Ledger>(
    ledger: &L,
    line: &DettaglioLinea,
    partner: &Partner,
    tax_use: TaxUse,
) -> Option<ProductId> {
    if line.codice_articolo.len() == 1 {
        if let Some(code) = line.codice_articolo[0].codice_valore.as_deref() {
            let matches = match tax_use {
                TaxUse::Purchase => ledger.supplier_products(partner.id, code),
                TaxUse::Sale => ledger.products_by_code(code),
            };
            if matches.len() == 1 {
                return Some(matches[0]);
            }
        }
    }
    partner.default_product
}

/// Let a resolved product refine the line's account and tax.
///
/// The product's expense account replaces the journal default. The
/// product (or account) tax replaces the XML-resolved tax only when both
/// carry the same rate — the typical partially-deductible case; a rate
/// conflict keeps the XML tax and logs an advisory.
pub fn adjust_accounting_data<L: Ledger>(
    ledger: &L,
    product_id: ProductId,
    line: &mut InvoiceLine,
    log: &mut Inconsistencies,
) {
    let Some(product) = ledger.product(product_id) else {
        return;
    };
    if let Some(expense) = product.expense_account {
        line.account = Some(expense);
    }

    let new_tax = if product.supplier_taxes.len() == 1 {
        Some(product.supplier_taxes[0])
    } else {
        line.account
            .and_then(|id| ledger.account(id))
            .filter(|account| account.taxes.len() == 1)
            .map(|account| account.taxes[0])
    };
    let Some(new_tax) = new_tax else {
        return;
    };
    if line.tax == Some(new_tax) {
        return;
    }
    let new_rate = ledger.tax(new_tax).map(|t| t.rate);
    let line_rate = line.tax.and_then(|id| ledger.tax(id)).map(|t| t.rate);
    match (line_rate, new_rate) {
        (Some(old), Some(new)) if old != new => {
            let old_name = line
                .tax
                .and_then(|id| ledger.tax(id))
                .map(|t| t.description)
                .unwrap_or_default();
            let new_name = ledger.tax(new_tax).map(|t| t.description).unwrap_or_default();
            log.push(format!(
                "XML contains tax {old_name}. Product {} has tax {new_name}. \
                 Using the XML one",
                product.name
            ));
        }
        _ => line.tax = Some(new_tax),
    }
}

/// Map one document detail line to a ledger line (per-line detail).
pub fn map_detail_line<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    partner: &Partner,
    line: &DettaglioLinea,
    account: AccountId,
    tax_use: TaxUse,
    withholdings: &[WithholdingTaxId],
    log: &mut Inconsistencies,
) -> InvoiceLine {
    let tax = resolve_tax(
        ledger,
        config,
        line.aliquota_iva,
        line.natura.as_deref(),
        tax_use,
        log,
    );
    let mut mapped = InvoiceLine {
        sequence: line.numero_linea.unwrap_or(0),
        name: line.descrizione.clone().unwrap_or_default(),
        account: Some(account),
        product: None,
        // An absent quantity means one unit; an explicit zero stays zero.
        quantity: line.quantita.unwrap_or(Decimal::ONE),
        price_unit: line.prezzo_unitario.unwrap_or(Decimal::ZERO),
        discount: derive_discount(line),
        tax,
        tax_rate: line.aliquota_iva.unwrap_or(Decimal::ZERO),
        tax_nature: line.natura.clone(),
        admin_ref: line.riferimento_amministrazione.clone(),
        withholdings: if line.ritenuta.as_deref() == Some("SI") {
            withholdings.to_vec()
        } else {
            Vec::new()
        },
        kind: LineKind::Detail,
    };
    if let Some(product) = resolve_line_product(ledger, line, partner, tax_use) {
        mapped.product = Some(product);
        adjust_accounting_data(ledger, product, &mut mapped, log);
    }
    mapped
}

/// Map one per-rate summary block to a ledger line (per-rate detail).
pub fn map_rate_line<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    partner: &Partner,
    sequence: u32,
    summary: &DatiRiepilogo,
    account: AccountId,
    tax_use: TaxUse,
    log: &mut Inconsistencies,
) -> InvoiceLine {
    let rate = summary.aliquota_iva.unwrap_or(Decimal::ZERO);
    let tax = resolve_tax(
        ledger,
        config,
        summary.aliquota_iva,
        summary.natura.as_deref(),
        tax_use,
        log,
    );
    let mut mapped = InvoiceLine {
        sequence,
        name: format!("Riepilogo Aliquota {rate}"),
        account: Some(account),
        product: None,
        quantity: Decimal::ONE,
        price_unit: summary.imponibile_importo.unwrap_or(Decimal::ZERO).abs(),
        discount: None,
        tax,
        tax_rate: rate,
        tax_nature: summary.natura.clone(),
        admin_ref: None,
        withholdings: Vec::new(),
        kind: LineKind::Summary,
    };
    if let Some(product) = partner.default_product {
        mapped.product = Some(product);
        adjust_accounting_data(ledger, product, &mut mapped, log);
    }
    mapped
}

/// Synthesize the invoice lines for one body at the given detail level.
/// Rounding adjustment lines are appended last, numbered after every
/// existing line.
pub fn map_lines<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    partner: &Partner,
    body: &FatturaElettronicaBody,
    detail_level: DetailLevel,
    account: AccountId,
    tax_use: TaxUse,
    withholdings: &[WithholdingTaxId],
    log: &mut Inconsistencies,
) -> Result<Vec<InvoiceLine>, FatturaError> {
    let mut lines = Vec::new();
    match detail_level {
        DetailLevel::Minimal => return Ok(lines),
        DetailLevel::PerRate => {
            for (n, summary) in body.dati_beni_servizi.dati_riepilogo.iter().enumerate() {
                lines.push(map_rate_line(
                    ledger,
                    config,
                    partner,
                    (n + 1) as u32,
                    summary,
                    account,
                    tax_use,
                    log,
                ));
            }
        }
        DetailLevel::PerLine => {
            for line in &body.dati_beni_servizi.dettaglio_linee {
                lines.push(map_detail_line(
                    ledger,
                    config,
                    partner,
                    line,
                    account,
                    tax_use,
                    withholdings,
                    log,
                ));
            }
        }
    }
    append_rounding_lines(ledger, config, body, &mut lines, tax_use, log)?;
    Ok(lines)
}

/// Append one rounding line per summary block that declares a rounding
/// amount. Positive amounts post to the round-down account, negative to
/// the round-up account; both accounts are required configuration once
/// any rounding appears.
pub fn append_rounding_lines<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    body: &FatturaElettronicaBody,
    lines: &mut Vec<InvoiceLine>,
    tax_use: TaxUse,
    log: &mut Inconsistencies,
) -> Result<(), FatturaError> {
    let dgd = &body.dati_generali.dati_generali_documento;
    let mut rounding: Decimal = body
        .dati_beni_servizi
        .dati_riepilogo
        .iter()
        .filter_map(|s| s.arrotondamento)
        .sum();
    rounding += dgd.arrotondamento.unwrap_or(Decimal::ZERO);
    if rounding.is_zero() {
        return Ok(());
    }

    let gain_account = config.rounding_gain_account.ok_or_else(|| {
        FatturaError::MissingConfiguration("round up account is not set in accounting settings".into())
    })?;
    let loss_account = config.rounding_loss_account.ok_or_else(|| {
        FatturaError::MissingConfiguration(
            "round down account is not set in accounting settings".into(),
        )
    })?;
    if config.rounding_tax.is_none() {
        log.push("Round up and down tax is not set".to_string());
    }

    let mut sequence = lines.iter().map(|l| l.sequence).max().unwrap_or(0);
    for summary in &body.dati_beni_servizi.dati_riepilogo {
        let Some(to_round) = summary.arrotondamento.filter(|r| !r.is_zero()) else {
            continue;
        };
        let tax = resolve_tax(
            ledger,
            config,
            summary.aliquota_iva,
            summary.natura.as_deref(),
            tax_use,
            log,
        )
        .or(config.rounding_tax);
        let (account, name) = if to_round > Decimal::ZERO {
            (loss_account, "Rounding down")
        } else {
            (gain_account, "Rounding up")
        };
        sequence += 1;
        lines.push(InvoiceLine {
            sequence,
            name: name.to_string(),
            account: Some(account),
            product: None,
            quantity: Decimal::ONE,
            price_unit: to_round,
            discount: None,
            tax,
            tax_rate: Decimal::ZERO,
            tax_nature: None,
            admin_ref: None,
            withholdings: Vec::new(),
            kind: LineKind::Rounding,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_derived_from_declared_total() {
        let line = DettaglioLinea {
            prezzo_unitario: Some(dec!(100)),
            quantita: Some(dec!(2)),
            prezzo_totale: Some(dec!(180)),
            sconto_maggiorazione: vec![Default::default()],
            ..Default::default()
        };
        assert_eq!(derive_discount(&line), Some(dec!(10.00)));
    }

    #[test]
    fn discount_needs_all_three_figures() {
        let mut line = DettaglioLinea {
            prezzo_unitario: Some(dec!(100)),
            quantita: Some(dec!(2)),
            prezzo_totale: Some(dec!(180)),
            sconto_maggiorazione: Vec::new(),
            ..Default::default()
        };
        // no discount block declared
        assert_eq!(derive_discount(&line), None);
        // zero quantity declared
        line.sconto_maggiorazione = vec![Default::default()];
        line.quantita = Some(Decimal::ZERO);
        assert_eq!(derive_discount(&line), None);
    }
}
