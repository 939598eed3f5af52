pub mod rates;
pub mod report;
pub mod schema;
pub mod validate;

use crate::tax::{rates as rate_file, transaction, ConversionOptions, RateTable, TransactionRecord};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Where the rate table comes from
#[derive(Args, Debug)]
pub struct RateArgs {
    /// Rate table file: CSV with `category,rate` columns, or JSON (.json).
    /// Built-in rates are used when omitted.
    #[arg(short, long)]
    rates: Option<PathBuf>,
}

impl RateArgs {
    pub fn read_rates(&self) -> anyhow::Result<RateTable> {
        let Some(path) = &self.rates else {
            log::info!("Using built-in tax rates");
            return Ok(RateTable::default());
        };

        let reader = open(path)?;
        let table = if is_json(path) {
            rate_file::read_json(reader)
        } else {
            rate_file::read_csv(reader)
        };
        table.with_context(|| format!("invalid rate table {}", path.display()))
    }
}

/// Sales input shared by the report and validate commands
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Sales file: CSV with `transaction_id,amount,category` columns, or JSON (.json)
    #[arg(short, long)]
    file: PathBuf,

    #[command(flatten)]
    rates: RateArgs,

    /// Category applied to records with a blank category
    #[arg(long)]
    default_category: Option<String>,
}

impl InputArgs {
    pub fn read_rates(&self) -> anyhow::Result<RateTable> {
        self.rates.read_rates()
    }

    pub fn read_sales(&self) -> anyhow::Result<Vec<TransactionRecord>> {
        let reader = open(&self.file)?;
        let records = if is_json(&self.file) {
            transaction::read_json(reader)
        } else {
            transaction::read_csv(reader)
        };
        records.with_context(|| format!("failed to read sales data from {}", self.file.display()))
    }

    /// Conversion options, checked against the active rate table
    pub fn conversion_options(&self, rates: &RateTable) -> anyhow::Result<ConversionOptions> {
        if let Some(category) = &self.default_category {
            if !rates.contains(category) {
                anyhow::bail!("default category '{}' is not in the rate table", category);
            }
        }
        Ok(ConversionOptions {
            default_category: self.default_category.clone(),
        })
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Format an amount with thousands separators, e.g. `$1,234.50`
pub fn format_money(amount: rust_decimal::Decimal) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

/// Format a rate as a percentage, e.g. `0.05` as `5.0%`
pub fn format_rate(rate: rust_decimal::Decimal) -> String {
    format!("{:.1}%", rate * rust_decimal::Decimal::ONE_HUNDRED)
}
