//! Tax resolution: map a (rate, nature) pair onto a configured tax.
//!
//! Never fatal — a chart of accounts that is not yet configured must not
//! block the rest of the import, so every miss degrades to an advisory
//! and the caller proceeds without a tax.

use rust_decimal::Decimal;
use tracing::warn;

use crate::core::{Inconsistencies, TaxId, TaxUse};
use crate::ledger::{CompanyConfig, Ledger};

/// Resolve a declared (rate, nature) pair to a tax record.
///
/// Zero rate with a nature code searches the zero-amount taxes classified
/// under that nature. Any other rate searches non-inclusive taxes at the
/// exact rate; on the purchase side taxes with child components are
/// excluded because partially-deductible VAT must be picked by hand. Rate
/// ties are broken by the company default tax, else by priority order.
pub fn resolve_tax<L: Ledger>(
    ledger: &L,
    config: &CompanyConfig,
    rate: Option<Decimal>,
    nature: Option<&str>,
    tax_use: TaxUse,
    log: &mut Inconsistencies,
) -> Option<TaxId> {
    let rate = rate.unwrap_or(Decimal::ZERO);

    if rate.is_zero() && nature.is_some() {
        let nature = nature.unwrap_or_default();
        let candidates: Vec<_> = ledger
            .taxes(tax_use)
            .into_iter()
            .filter(|t| t.rate.is_zero() && t.nature.as_deref() == Some(nature))
            .collect();
        match candidates.len() {
            0 => {
                log.push(format!(
                    "No tax with percentage {rate} and nature {nature} found. \
                     Please configure this tax."
                ));
                None
            }
            1 => Some(candidates[0].id),
            _ => {
                log.push(format!(
                    "Too many taxes with percentage {rate} and nature {nature} found. \
                     Tax {} with lower priority has been set on invoice lines.",
                    candidates[0].description
                ));
                Some(candidates[0].id)
            }
        }
    } else {
        let candidates: Vec<_> = ledger
            .taxes(tax_use)
            .into_iter()
            .filter(|t| {
                t.rate == rate
                    && !t.price_include
                    && (tax_use == TaxUse::Sale || !t.has_children)
            })
            .collect();
        match candidates.len() {
            0 => {
                log.push(format!(
                    "XML contains tax with percentage '{rate}' but it does not exist \
                     in your system"
                ));
                None
            }
            1 => Some(candidates[0].id),
            _ => {
                // Usual case: split payment mirrors the ordinary rate.
                warn!(%rate, "multiple taxes configured at the same percentage");
                if let Some(default) = config.default_tax(tax_use) {
                    if let Some(tax) = ledger.tax(default) {
                        if tax.rate == rate {
                            return Some(default);
                        }
                    }
                }
                Some(candidates[0].id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryLedger, TaxRecord};
    use rust_decimal_macros::dec;

    fn tax(description: &str, tax_use: TaxUse, rate: Decimal, priority: u32) -> TaxRecord {
        TaxRecord {
            id: TaxId(0),
            description: description.into(),
            tax_use,
            rate,
            price_include: false,
            nature: None,
            has_children: false,
            priority,
        }
    }

    #[test]
    fn missing_tax_is_advisory() {
        let ledger = MemoryLedger::new();
        let config = CompanyConfig::new("ACME", "IT", "00000000001");
        let mut log = Inconsistencies::new();
        let resolved = resolve_tax(&ledger, &config, Some(dec!(22)), None, TaxUse::Purchase, &mut log);
        assert_eq!(resolved, None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn default_tax_breaks_rate_ties() {
        let mut ledger = MemoryLedger::new();
        ledger.insert_tax(tax("22% normale", TaxUse::Purchase, dec!(22), 1));
        let split = ledger.insert_tax(tax("22% split", TaxUse::Purchase, dec!(22), 2));
        let mut config = CompanyConfig::new("ACME", "IT", "00000000001");
        config.default_purchase_tax = Some(split);

        let mut log = Inconsistencies::new();
        let resolved = resolve_tax(&ledger, &config, Some(dec!(22)), None, TaxUse::Purchase, &mut log);
        assert_eq!(resolved, Some(split));
        assert!(log.is_empty());
    }

    #[test]
    fn rate_tie_without_default_uses_priority_order() {
        let mut ledger = MemoryLedger::new();
        let low = ledger.insert_tax(tax("22% A", TaxUse::Purchase, dec!(22), 1));
        ledger.insert_tax(tax("22% B", TaxUse::Purchase, dec!(22), 2));
        let config = CompanyConfig::new("ACME", "IT", "00000000001");

        let mut log = Inconsistencies::new();
        let resolved = resolve_tax(&ledger, &config, Some(dec!(22)), None, TaxUse::Purchase, &mut log);
        assert_eq!(resolved, Some(low));
    }

    #[test]
    fn zero_rate_matches_nature_classification() {
        let mut ledger = MemoryLedger::new();
        let mut exempt = tax("Esente art.10", TaxUse::Purchase, dec!(0), 1);
        exempt.nature = Some("N4".into());
        let exempt = ledger.insert_tax(exempt);
        let config = CompanyConfig::new("ACME", "IT", "00000000001");

        let mut log = Inconsistencies::new();
        let resolved = resolve_tax(
            &ledger,
            &config,
            Some(dec!(0)),
            Some("N4"),
            TaxUse::Purchase,
            &mut log,
        );
        assert_eq!(resolved, Some(exempt));

        let missing = resolve_tax(
            &ledger,
            &config,
            Some(dec!(0)),
            Some("N1"),
            TaxUse::Purchase,
            &mut log,
        );
        assert_eq!(missing, None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn purchase_side_skips_compound_taxes() {
        let mut ledger = MemoryLedger::new();
        let mut parent = tax("22% det 50%", TaxUse::Purchase, dec!(22), 1);
        parent.has_children = true;
        ledger.insert_tax(parent);
        let plain = ledger.insert_tax(tax("22%", TaxUse::Purchase, dec!(22), 2));
        let config = CompanyConfig::new("ACME", "IT", "00000000001");

        let mut log = Inconsistencies::new();
        let resolved = resolve_tax(&ledger, &config, Some(dec!(22)), None, TaxUse::Purchase, &mut log);
        assert_eq!(resolved, Some(plain));
        assert!(log.is_empty());
    }
}
