//! Report command - compute tax for every sale and summarise

use super::{format_money, format_rate, InputArgs};
use crate::tax::{BatchPolicy, CategorySummary, RejectedRecord, SalesReport, TaxCalculator, TaxResult};
use chrono::Local;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

const RULE_WIDTH: usize = 80;

/// Column order of `OutputRecord` in CSV output
const CSV_COLUMNS: [&str; 7] = [
    "transaction_id",
    "amount",
    "category",
    "rate",
    "tax_amount",
    "total_amount",
    "status",
];

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Abort on the first rejected record instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Output enriched records as CSV instead of a formatted report
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Row for the formatted transactions table
#[derive(Debug, Clone, Tabled)]
struct ResultRow {
    #[tabled(rename = "Transaction")]
    transaction_id: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&TaxResult> for ResultRow {
    fn from(result: &TaxResult) -> Self {
        ResultRow {
            transaction_id: display_id(&result.transaction.id),
            category: result.transaction.category.clone(),
            amount: format_money(result.transaction.amount),
            rate: format_rate(result.rate),
            tax: format_money(result.tax),
            total: format_money(result.total),
            status: result.status().to_string(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Transactions")]
    count: usize,
    #[tabled(rename = "Sales")]
    sales: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

impl From<&CategorySummary> for CategoryRow {
    fn from(summary: &CategorySummary) -> Self {
        CategoryRow {
            category: summary.category.to_uppercase(),
            count: summary.count,
            sales: format_money(summary.sales),
            tax: format_money(summary.tax),
            rate: format_rate(summary.rate),
        }
    }
}

/// Enriched record for CSV and JSON output
#[derive(Debug, Clone, Serialize)]
struct OutputRecord {
    transaction_id: Option<String>,
    amount: Decimal,
    category: String,
    rate: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    status: String,
}

impl From<&TaxResult> for OutputRecord {
    fn from(result: &TaxResult) -> Self {
        OutputRecord {
            transaction_id: result.transaction.id.clone(),
            amount: result.transaction.amount,
            category: result.transaction.category.clone(),
            rate: result.rate,
            tax_amount: result.tax,
            total_amount: result.total,
            status: result.status().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RejectedOutput {
    row: usize,
    transaction_id: Option<String>,
    error: String,
}

impl From<&RejectedRecord> for RejectedOutput {
    fn from(rejected: &RejectedRecord) -> Self {
        RejectedOutput {
            row: rejected.row,
            transaction_id: rejected.transaction_id.clone(),
            error: rejected.error.to_string(),
        }
    }
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ReportOutput {
    generated: String,
    transaction_count: usize,
    total_sales: Decimal,
    total_tax: Decimal,
    total_revenue: Decimal,
    categories: Vec<CategorySummary>,
    transactions: Vec<OutputRecord>,
    rejected: Vec<RejectedOutput>,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let calculator = TaxCalculator::new(self.input.read_rates()?);
        let options = self.input.conversion_options(calculator.rates())?;
        let records = self.input.read_sales()?;

        let policy = if self.strict {
            BatchPolicy::Abort
        } else {
            BatchPolicy::Skip
        };
        let report = SalesReport::build(&records, &options, &calculator, policy)?;

        let mut out = self.writer()?;
        if self.csv {
            write_csv(&report, &mut out)?;
        } else if self.json {
            write_json(&report, &mut out)?;
        } else {
            write_text(&report, &mut out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => {
                log::info!("Writing report to {}", path.display());
                Box::new(BufWriter::new(File::create(path)?))
            }
            None => Box::new(io::stdout().lock()),
        })
    }
}

fn write_text(report: &SalesReport, out: &mut dyn Write) -> anyhow::Result<()> {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    writeln!(out, "{}", heavy)?;
    writeln!(out, "TAX CALCULATION REPORT")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out)?;

    if report.results.is_empty() {
        writeln!(out, "No transactions could be taxed")?;
    } else {
        let rows: Vec<ResultRow> = report.results.iter().map(Into::into).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
            .to_string();
        writeln!(out, "{}", table)?;
    }
    writeln!(out)?;

    writeln!(out, "Total Transactions: {}", report.results.len())?;
    writeln!(out, "Total Sales (pre-tax): {}", format_money(report.total_sales()))?;
    writeln!(out, "Total Tax Collected: {}", format_money(report.total_tax()))?;
    writeln!(out, "Total Revenue: {}", format_money(report.total_revenue()))?;

    let categories = report.by_category();
    if !categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", light)?;
        writeln!(out, "Category Breakdown:")?;
        writeln!(out, "{}", light)?;
        let rows: Vec<CategoryRow> = categories.iter().map(Into::into).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        writeln!(out, "{}", table)?;
    }

    if !report.rejected.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", light)?;
        writeln!(out, "Rejected Records: {}", report.rejected.len())?;
        writeln!(out, "{}", light)?;
        for rejected in &report.rejected {
            writeln!(
                out,
                "  Row {} ({}): {}",
                rejected.row,
                display_id(&rejected.transaction_id),
                rejected.error
            )?;
        }
    }

    writeln!(out, "{}", heavy)?;
    Ok(())
}

fn write_csv(report: &SalesReport, out: &mut dyn Write) -> anyhow::Result<()> {
    // Header written by hand so an all-rejected batch still gets one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    wtr.write_record(CSV_COLUMNS)?;
    for result in &report.results {
        wtr.serialize(OutputRecord::from(result))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_json(report: &SalesReport, out: &mut dyn Write) -> anyhow::Result<()> {
    let output = ReportOutput {
        generated: Local::now().to_rfc3339(),
        transaction_count: report.results.len(),
        total_sales: report.total_sales(),
        total_tax: report.total_tax(),
        total_revenue: report.total_revenue(),
        categories: report.by_category(),
        transactions: report.results.iter().map(Into::into).collect(),
        rejected: report.rejected.iter().map(Into::into).collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)?;
    Ok(())
}

fn display_id(id: &Option<String>) -> String {
    id.clone().unwrap_or_else(|| "N/A".to_string())
}
