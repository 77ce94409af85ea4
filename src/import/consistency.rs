//! Post-assembly reconciliation of computed vs declared totals.

use rust_decimal::Decimal;

use crate::core::{Inconsistencies, Invoice};
use crate::schema::FatturaElettronicaBody;

/// Equal within the currency's 2-decimal minor unit.
fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).round_dp(2).is_zero()
}

/// Compare the assembled invoice against the document's declared figures.
///
/// When a global discount/surcharge is declared the per-rate taxable
/// amounts are pre-discount and cannot be compared, so the check falls
/// back to the declared grand total; otherwise the pre-tax total is
/// checked against the summed per-rate taxable amounts. Only advisories
/// come back — the invoice is never touched.
pub fn check(invoice: &Invoice, body: &FatturaElettronicaBody) -> Inconsistencies {
    let mut log = Inconsistencies::new();
    let Some(totals) = invoice.totals.as_ref() else {
        return log;
    };

    let dgd = &body.dati_generali.dati_generali_documento;
    if !dgd.sconto_maggiorazione.is_empty() && dgd.importo_totale_documento.is_some() {
        let declared = dgd.importo_totale_documento.unwrap_or(Decimal::ZERO);
        if !within_tolerance(totals.amount_total, declared) {
            log.push(format!(
                "Bill total {} is different from document total amount {declared}",
                totals.amount_total
            ));
        }
    } else {
        let declared_untaxed: Decimal = body
            .dati_beni_servizi
            .dati_riepilogo
            .iter()
            .filter_map(|s| s.imponibile_importo)
            .sum();
        if !within_tolerance(totals.amount_untaxed, declared_untaxed) {
            log.push(format!(
                "Computed amount untaxed {} is different from summary data {declared_untaxed}",
                totals.amount_untaxed
            ));
        }
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sub_cent_differences_pass() {
        assert!(within_tolerance(dec!(100.00), dec!(100.004)));
        assert!(!within_tolerance(dec!(100.00), dec!(100.02)));
    }
}
