use super::calculator::{TaxCalculator, TaxResult, CURRENCY_DP};
use super::transaction::{ConversionOptions, TaxError, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// What to do with a record that fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Collect the failure and carry on with the next record
    #[default]
    Skip,
    /// Stop at the first failure
    Abort,
}

/// A record that could not be taxed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// 1-based position among the data records of the input
    pub row: usize,
    pub transaction_id: Option<String>,
    pub error: TaxError,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("record {row} ({}) rejected: {error}", .transaction_id.as_deref().unwrap_or("no id"))]
pub struct BatchAborted {
    pub row: usize,
    pub transaction_id: Option<String>,
    pub error: TaxError,
}

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub rate: Decimal,
    pub count: usize,
    pub sales: Decimal,
    pub tax: Decimal,
}

/// Running sums over the accepted results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Totals {
    sales: Decimal,
    tax: Decimal,
    revenue: Decimal,
}

impl Default for Totals {
    fn default() -> Self {
        let zero = Decimal::new(0, CURRENCY_DP);
        Totals {
            sales: zero,
            tax: zero,
            revenue: zero,
        }
    }
}

impl Totals {
    /// `None` if any of the sums would overflow
    fn add(self, result: &TaxResult) -> Option<Totals> {
        let sales = self.sales.checked_add(result.transaction.amount)?;
        let tax = self.tax.checked_add(result.tax)?;
        let revenue = sales.checked_add(tax)?;
        Some(Totals {
            sales,
            tax,
            revenue,
        })
    }
}

/// Tax results for a whole sales file
#[derive(Debug, Default)]
pub struct SalesReport {
    pub results: Vec<TaxResult>,
    pub rejected: Vec<RejectedRecord>,
    totals: Totals,
}

impl SalesReport {
    /// Apply the calculator to every record independently.
    ///
    /// A record whose amount would push the report totals past the `Decimal`
    /// range is rejected with [`TaxError::AmountOutOfRange`].
    pub fn build(
        records: &[TransactionRecord],
        options: &ConversionOptions,
        calculator: &TaxCalculator,
        policy: BatchPolicy,
    ) -> Result<Self, BatchAborted> {
        let mut report = SalesReport::default();

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            let totals = report.totals;
            let outcome = record
                .to_transaction(options)
                .and_then(|tx| calculator.compute_transaction(tx))
                .and_then(|result| match totals.add(&result) {
                    Some(totals) => Ok((result, totals)),
                    None => Err(TaxError::AmountOutOfRange(
                        result.transaction.amount.to_string(),
                    )),
                });

            match outcome {
                Ok((result, totals)) => {
                    report.totals = totals;
                    report.results.push(result);
                }
                Err(error) => {
                    if policy == BatchPolicy::Abort {
                        return Err(BatchAborted {
                            row,
                            transaction_id: record.transaction_id.clone(),
                            error,
                        });
                    }
                    log::warn!(
                        "Skipping record {} ({}): {}",
                        row,
                        record.transaction_id.as_deref().unwrap_or("no id"),
                        error
                    );
                    report.rejected.push(RejectedRecord {
                        row,
                        transaction_id: record.transaction_id.clone(),
                        error,
                    });
                }
            }
        }

        log::info!(
            "Processed {} records: {} taxed, {} rejected",
            records.len(),
            report.results.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Sum of pre-tax amounts
    pub fn total_sales(&self) -> Decimal {
        self.totals.sales
    }

    pub fn total_tax(&self) -> Decimal {
        self.totals.tax
    }

    /// Sales plus tax
    pub fn total_revenue(&self) -> Decimal {
        self.totals.revenue
    }

    /// Per-category totals, sorted by category
    pub fn by_category(&self) -> Vec<CategorySummary> {
        let mut categories: BTreeMap<&str, CategorySummary> = BTreeMap::new();
        for result in &self.results {
            let category = result.transaction.category.as_str();
            let summary = categories.entry(category).or_insert_with(|| CategorySummary {
                category: category.to_string(),
                rate: result.rate,
                count: 0,
                sales: Decimal::ZERO,
                tax: Decimal::ZERO,
            });
            // Never exceeds the report totals, which `build` keeps in range
            summary.count += 1;
            summary.sales += result.transaction.amount;
            summary.tax += result.tax;
        }
        categories.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::rates::RateTable;
    use rust_decimal_macros::dec;

    fn record(id: &str, amount: &str, category: &str) -> TransactionRecord {
        TransactionRecord {
            transaction_id: Some(id.to_string()),
            amount: amount.to_string(),
            category: Some(category.to_string()),
        }
    }

    fn sample_records() -> Vec<TransactionRecord> {
        vec![
            record("T1", "100.00", "standard"),
            record("T2", "50.00", "zero"),
            record("T3", "20.00", "reduced"),
            record("T4", "10.00", "luxury"),
            record("T5", "abc", "standard"),
            record("T6", "200.00", "standard"),
        ]
    }

    fn build(records: &[TransactionRecord], policy: BatchPolicy) -> Result<SalesReport, BatchAborted> {
        SalesReport::build(
            records,
            &ConversionOptions::default(),
            &TaxCalculator::default(),
            policy,
        )
    }

    #[test]
    fn skip_policy_continues_past_failures() {
        let report = build(&sample_records(), BatchPolicy::Skip).unwrap();
        assert_eq!(report.results.len(), 4);
        assert_eq!(
            report.rejected,
            vec![
                RejectedRecord {
                    row: 4,
                    transaction_id: Some("T4".to_string()),
                    error: TaxError::UnknownCategory("luxury".to_string()),
                },
                RejectedRecord {
                    row: 5,
                    transaction_id: Some("T5".to_string()),
                    error: TaxError::InvalidAmount("abc".to_string()),
                },
            ]
        );
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let err = build(&sample_records(), BatchPolicy::Abort).unwrap_err();
        assert_eq!(err.row, 4);
        assert_eq!(err.transaction_id, Some("T4".to_string()));
        assert_eq!(err.error, TaxError::UnknownCategory("luxury".to_string()));
        assert_eq!(
            err.to_string(),
            "record 4 (T4) rejected: category not found: 'luxury'"
        );
    }

    #[test]
    fn abort_policy_succeeds_on_clean_input() {
        let records = vec![record("T1", "100.00", "standard")];
        let report = build(&records, BatchPolicy::Abort).unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn totals_only_count_accepted_records() {
        let report = build(&sample_records(), BatchPolicy::Skip).unwrap();
        assert_eq!(report.total_sales(), dec!(370.00));
        assert_eq!(report.total_tax(), dec!(31.00));
        assert_eq!(report.total_revenue(), dec!(401.00));
    }

    #[test]
    fn category_breakdown_sorted() {
        let report = build(&sample_records(), BatchPolicy::Skip).unwrap();
        let breakdown = report.by_category();
        let names: Vec<_> = breakdown.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["reduced", "standard", "zero"]);

        let standard = &breakdown[1];
        assert_eq!(standard.count, 2);
        assert_eq!(standard.sales, dec!(300.00));
        assert_eq!(standard.tax, dec!(30.00));
        assert_eq!(standard.rate, dec!(0.10));
    }

    #[test]
    fn empty_batch() {
        let report = build(&[], BatchPolicy::Skip).unwrap();
        assert!(report.results.is_empty());
        assert!(report.total_revenue().is_zero());
        assert!(report.by_category().is_empty());
    }

    #[test]
    fn empty_batch_totals_have_currency_precision() {
        let report = build(&[], BatchPolicy::Skip).unwrap();
        assert_eq!(report.total_tax().to_string(), "0.00");
        assert_eq!(report.total_revenue().to_string(), "0.00");
    }

    #[test]
    fn record_overflowing_totals_is_rejected() {
        let records = vec![
            record("T1", "40000000000000000000000000000", "zero"),
            record("T2", "40000000000000000000000000000", "zero"),
            record("T3", "79228162514264337593543950335", "standard"),
            record("T4", "10.00", "standard"),
        ];
        let report = build(&records, BatchPolicy::Skip).unwrap();

        let accepted: Vec<_> = report
            .results
            .iter()
            .filter_map(|r| r.transaction.id.as_deref())
            .collect();
        assert_eq!(accepted, vec!["T1", "T4"]);
        assert_eq!(
            report.rejected[0],
            RejectedRecord {
                row: 2,
                transaction_id: Some("T2".to_string()),
                error: TaxError::AmountOutOfRange("40000000000000000000000000000".to_string()),
            }
        );
        assert_eq!(
            report.rejected[1].error,
            TaxError::AmountOutOfRange("79228162514264337593543950335".to_string())
        );
        assert_eq!(report.total_sales(), dec!(40000000000000000000000000010));
        assert_eq!(report.total_tax(), dec!(1.00));
        assert_eq!(report.by_category().len(), 2);
    }

    #[test]
    fn oversized_record_aborts_strict_batch() {
        let records = vec![record("T1", "79228162514264337593543950335", "standard")];
        let err = build(&records, BatchPolicy::Abort).unwrap_err();
        assert_eq!(err.row, 1);
        assert_eq!(
            err.error,
            TaxError::AmountOutOfRange("79228162514264337593543950335".to_string())
        );
    }

    #[test]
    fn category_case_grouped_together() {
        let records = vec![
            record("T1", "10.00", "Standard"),
            record("T2", "10.00", "STANDARD"),
        ];
        let report = build(&records, BatchPolicy::Skip).unwrap();
        let breakdown = report.by_category();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].count, 2);
    }

    #[test]
    fn custom_rates_and_default_category() {
        let rates = RateTable::new([("food", dec!(0)), ("general", dec!(0.2))]).unwrap();
        let options = ConversionOptions {
            default_category: Some("general".to_string()),
        };
        let records = vec![
            TransactionRecord {
                transaction_id: None,
                amount: "10.00".to_string(),
                category: None,
            },
            record("T2", "5.00", "food"),
        ];
        let report =
            SalesReport::build(&records, &options, &TaxCalculator::new(rates), BatchPolicy::Abort)
                .unwrap();
        assert_eq!(report.total_tax(), dec!(2.00));
        assert_eq!(report.results[0].transaction.category, "general");
    }
}
