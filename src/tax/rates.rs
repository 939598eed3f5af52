//! Rate table - the static category to tax rate mapping

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateTableError {
    #[error("rate table has no categories")]
    Empty,
    #[error("rate table contains an empty category name")]
    EmptyCategory,
    #[error("duplicate category in rate table: {0}")]
    DuplicateCategory(String),
    #[error("rate for '{category}' must be between 0 and 1, got {rate}")]
    RateOutOfRange { category: String, rate: Decimal },
}

/// Canonical form of a category label, used for both table keys and lookups
pub fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}

/// Immutable mapping from category to tax rate (a fraction in `[0, 1]`).
///
/// Categories are kept in sorted order so listings and breakdowns are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RateTable(BTreeMap<String, Decimal>);

impl RateTable {
    /// Build a validated rate table.
    ///
    /// Fails if there are no entries, a category is blank, a category appears
    /// twice (after normalization) or a rate lies outside `[0, 1]`.
    pub fn new<I, S>(entries: I) -> Result<Self, RateTableError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut rates = BTreeMap::new();
        for (category, rate) in entries {
            let category = normalize_category(category.as_ref());
            if category.is_empty() {
                return Err(RateTableError::EmptyCategory);
            }
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(RateTableError::RateOutOfRange { category, rate });
            }
            if rates.contains_key(&category) {
                return Err(RateTableError::DuplicateCategory(category));
            }
            rates.insert(category, rate);
        }

        if rates.is_empty() {
            return Err(RateTableError::Empty);
        }
        Ok(RateTable(rates))
    }

    /// Rate for a category, if the table has one
    pub fn rate(&self, category: &str) -> Option<Decimal> {
        self.0.get(&normalize_category(category)).copied()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.rate(category).is_some()
    }

    /// Entries in category order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(category, rate)| (category.as_str(), *rate))
    }
}

impl Default for RateTable {
    /// Built-in rates used when no rate file is given
    fn default() -> Self {
        RateTable(BTreeMap::from([
            ("standard".to_string(), dec!(0.10)),
            ("reduced".to_string(), dec!(0.05)),
            ("zero".to_string(), dec!(0.00)),
        ]))
    }
}

/// CSV record format for rate files
#[derive(Debug, Clone, Deserialize)]
struct RateRecord {
    category: String,
    rate: Decimal,
}

/// JSON rate file format
#[derive(Debug, Clone, Deserialize)]
struct RateFile {
    rates: BTreeMap<String, Decimal>,
}

/// Read a rate table from CSV with `category,rate` columns
pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<RateTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records: Result<Vec<RateRecord>, _> = rdr.deserialize::<RateRecord>().collect();
    let table = RateTable::new(records?.into_iter().map(|r| (r.category, r.rate)))?;
    log::info!("Loaded {} tax rates", table.iter().count());
    Ok(table)
}

/// Read a rate table from JSON (`{"rates": {"standard": "0.10", ...}}`)
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<RateTable> {
    let input: RateFile = serde_json::from_reader(reader)?;
    let table = RateTable::new(input.rates)?;
    log::info!("Loaded {} tax rates", table.iter().count());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_rates() {
        let table = RateTable::default();
        assert_eq!(table.rate("standard"), Some(dec!(0.10)));
        assert_eq!(table.rate("reduced"), Some(dec!(0.05)));
        assert_eq!(table.rate("zero"), Some(dec!(0.00)));
        assert_eq!(table.rate("luxury"), None);
    }

    #[test]
    fn default_table_passes_validation() {
        let rebuilt = RateTable::new(RateTable::default().iter()).unwrap();
        assert_eq!(rebuilt, RateTable::default());
    }

    #[test]
    fn all_rates_within_bounds() {
        for (_, rate) in RateTable::default().iter() {
            assert!(rate >= Decimal::ZERO && rate <= Decimal::ONE);
        }
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let table = RateTable::new([(" Standard ", dec!(0.2))]).unwrap();
        assert_eq!(table.rate("standard"), Some(dec!(0.2)));
        assert_eq!(table.rate("STANDARD"), Some(dec!(0.2)));
        assert!(table.contains(" standard"));
    }

    #[test]
    fn iter_in_category_order() {
        let table = RateTable::default();
        let categories: Vec<_> = table.iter().map(|(c, _)| c).collect();
        assert_eq!(categories, vec!["reduced", "standard", "zero"]);
    }

    #[test]
    fn empty_table_rejected() {
        let entries: Vec<(String, Decimal)> = Vec::new();
        assert_eq!(RateTable::new(entries), Err(RateTableError::Empty));
    }

    #[test]
    fn blank_category_rejected() {
        assert_eq!(
            RateTable::new([("  ", dec!(0.1))]),
            Err(RateTableError::EmptyCategory)
        );
    }

    #[test]
    fn duplicate_category_rejected() {
        assert_eq!(
            RateTable::new([("standard", dec!(0.1)), ("Standard", dec!(0.2))]),
            Err(RateTableError::DuplicateCategory("standard".to_string()))
        );
    }

    #[test]
    fn rate_out_of_range_rejected() {
        assert_eq!(
            RateTable::new([("luxury", dec!(1.5))]),
            Err(RateTableError::RateOutOfRange {
                category: "luxury".to_string(),
                rate: dec!(1.5),
            })
        );
        assert!(RateTable::new([("refund", dec!(-0.1))]).is_err());
    }

    #[test]
    fn boundary_rates_accepted() {
        let table = RateTable::new([("none", dec!(0)), ("all", dec!(1))]).unwrap();
        assert_eq!(table.rate("all"), Some(Decimal::ONE));
        assert_eq!(table.rate("none"), Some(Decimal::ZERO));
    }

    #[test]
    fn parse_csv_rates() {
        let csv_data = "category,rate\nstandard,0.20\nreduced, 0.05\nfood,0\n";
        let table = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(table.rate("standard"), Some(dec!(0.20)));
        assert_eq!(table.rate("reduced"), Some(dec!(0.05)));
        assert_eq!(table.rate("food"), Some(Decimal::ZERO));
    }

    #[test]
    fn parse_csv_rejects_duplicates() {
        let csv_data = "category,rate\nstandard,0.20\nSTANDARD,0.10\n";
        assert!(read_csv(csv_data.as_bytes()).is_err());
    }

    #[test]
    fn parse_json_rates() {
        let json_data = r#"{ "rates": { "standard": "0.10", "luxury": "0.25" } }"#;
        let table = read_json(json_data.as_bytes()).unwrap();
        assert_eq!(table.rate("luxury"), Some(dec!(0.25)));
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn parse_json_rejects_out_of_range() {
        let json_data = r#"{ "rates": { "standard": "2" } }"#;
        assert!(read_json(json_data.as_bytes()).is_err());
    }
}
