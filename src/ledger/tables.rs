//! Keyed code tables injected into the resolvers.
//!
//! Every external reason/type code the documents carry (countries,
//! provinces, fiscal regimes, document types, welfare-fund types,
//! currencies) resolves through one of these tables; resolvers decide
//! per field whether a miss is fatal or advisory.

use std::collections::BTreeMap;

/// A code → display-name lookup table.
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    entries: BTreeMap<String, String>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::new();
        for code in codes {
            table.insert(code, code);
        }
        table
    }

    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.entries.insert(code.into(), name.into());
    }

    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The full set of reference tables used during import and export.
#[derive(Debug, Clone, Default)]
pub struct CodeTables {
    /// ISO 3166-1 alpha-2 country codes.
    pub countries: CodeTable,
    /// Italian province codes (sigle automobilistiche).
    pub provinces: CodeTable,
    /// RFxx fiscal regimes.
    pub fiscal_regimes: CodeTable,
    /// TDxx document types.
    pub document_types: CodeTable,
    /// TCxx welfare-fund types.
    pub welfare_fund_types: CodeTable,
    /// ISO 4217 currency codes.
    pub currencies: CodeTable,
}

impl CodeTables {
    /// Tables pre-seeded with the statutory Italian code lists.
    pub fn italian_defaults() -> Self {
        Self {
            countries: CodeTable::from_codes(COUNTRY_CODES.iter().copied()),
            provinces: CodeTable::from_codes(PROVINCE_CODES.iter().copied()),
            fiscal_regimes: CodeTable::from_codes(FISCAL_REGIMES.iter().copied()),
            document_types: CodeTable::from_codes(DOCUMENT_TYPES.iter().copied()),
            welfare_fund_types: CodeTable::from_codes(WELFARE_FUND_TYPES.iter().copied()),
            currencies: CodeTable::from_codes(CURRENCIES.iter().copied()),
        }
    }
}

/// ISO 3166-1 alpha-2 country codes (249 entries), sorted.
static COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

/// Italian province codes, sorted.
static PROVINCE_CODES: &[&str] = &[
    "AG", "AL", "AN", "AO", "AP", "AQ", "AR", "AT", "AV", "BA", "BG", "BI", "BL", "BN", "BO", "BR",
    "BS", "BT", "BZ", "CA", "CB", "CE", "CH", "CL", "CN", "CO", "CR", "CS", "CT", "CZ", "EN", "FC",
    "FE", "FG", "FI", "FM", "FR", "GE", "GO", "GR", "IM", "IS", "KR", "LC", "LE", "LI", "LO", "LT",
    "LU", "MB", "MC", "ME", "MI", "MN", "MO", "MS", "MT", "NA", "NO", "NU", "OR", "PA", "PC", "PD",
    "PE", "PG", "PI", "PN", "PO", "PR", "PT", "PU", "PV", "PZ", "RA", "RC", "RE", "RG", "RI", "RM",
    "RN", "RO", "SA", "SI", "SO", "SP", "SR", "SS", "SU", "SV", "TA", "TE", "TN", "TO", "TP", "TR",
    "TS", "TV", "UD", "VA", "VB", "VC", "VE", "VI", "VR", "VT", "VV",
];

/// RegimeFiscale codes.
static FISCAL_REGIMES: &[&str] = &[
    "RF01", "RF02", "RF04", "RF05", "RF06", "RF07", "RF08", "RF09", "RF10", "RF11", "RF12", "RF13",
    "RF14", "RF15", "RF16", "RF17", "RF18", "RF19",
];

/// TipoDocumento codes.
static DOCUMENT_TYPES: &[&str] = &[
    "TD01", "TD02", "TD03", "TD04", "TD05", "TD06", "TD16", "TD17", "TD18", "TD19", "TD20", "TD21",
    "TD22", "TD23", "TD24", "TD25", "TD26", "TD27",
];

/// TipoCassa codes.
static WELFARE_FUND_TYPES: &[&str] = &[
    "TC01", "TC02", "TC03", "TC04", "TC05", "TC06", "TC07", "TC08", "TC09", "TC10", "TC11", "TC12",
    "TC13", "TC14", "TC15", "TC16", "TC17", "TC18", "TC19", "TC20", "TC21", "TC22",
];

/// Currencies accepted without further configuration.
static CURRENCIES: &[&str] = &[
    "AUD", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HUF", "JPY", "NOK", "PLN", "RON",
    "SEK", "USD",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_statutory_codes() {
        let tables = CodeTables::italian_defaults();
        assert!(tables.countries.contains("IT"));
        assert!(tables.provinces.contains("MI"));
        assert!(tables.fiscal_regimes.contains("RF01"));
        assert!(tables.document_types.contains("TD04"));
        assert!(tables.welfare_fund_types.contains("TC07"));
        assert!(tables.currencies.contains("EUR"));
        assert!(!tables.fiscal_regimes.contains("RF03"));
    }

    #[test]
    fn static_lists_are_sorted() {
        for list in [COUNTRY_CODES, PROVINCE_CODES, FISCAL_REGIMES, DOCUMENT_TYPES] {
            for window in list.windows(2) {
                assert!(window[0] < window[1], "{} >= {}", window[0], window[1]);
            }
        }
    }
}
