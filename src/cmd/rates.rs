//! Rates command - show the active rate table

use super::{format_rate, RateArgs};
use crate::tax::{RateTable, TaxStatus};
use clap::Args;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RatesCommand {
    #[command(flatten)]
    rates: RateArgs,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct RateRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl RatesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let table = self.rates.read_rates()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&table)?);
        } else {
            println!("CURRENT TAX RATES");
            println!("{}", render(&table));
        }
        Ok(())
    }
}

fn render(table: &RateTable) -> String {
    let rows: Vec<RateRow> = table
        .iter()
        .map(|(category, rate)| RateRow {
            category: category.to_string(),
            rate: format_rate(rate),
            status: TaxStatus::for_rate(rate).to_string(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string()
}
