//! Validate command - surface bad records without producing a report

use super::InputArgs;
use crate::tax::{BatchPolicy, RejectedRecord, SalesReport, TaxCalculator, TaxError};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    row: usize,
    transaction_id: Option<String>,
    message: String,
}

impl From<&RejectedRecord> for ValidationIssue {
    fn from(rejected: &RejectedRecord) -> Self {
        let issue_type = match rejected.error {
            TaxError::UnknownCategory(_) => "UnknownCategory",
            TaxError::InvalidAmount(_) => "InvalidAmount",
            TaxError::AmountOutOfRange(_) => "AmountOutOfRange",
        };
        ValidationIssue {
            issue_type: issue_type.to_string(),
            row: rejected.row,
            transaction_id: rejected.transaction_id.clone(),
            message: rejected.error.to_string(),
        }
    }
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    record_count: usize,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let calculator = TaxCalculator::new(self.input.read_rates()?);
        let options = self.input.conversion_options(calculator.rates())?;
        let records = self.input.read_sales()?;

        let report = SalesReport::build(&records, &options, &calculator, BatchPolicy::Skip)?;
        let issues: Vec<ValidationIssue> = report.rejected.iter().map(Into::into).collect();

        if self.json {
            let output = ValidationOutput {
                record_count: records.len(),
                issue_count: issues.len(),
                issues: issues.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(records.len(), &issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn print_text(record_count: usize, issues: &[ValidationIssue]) {
    println!();
    println!("VALIDATION RESULTS ({} records)", record_count);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for (i, issue) in issues.iter().enumerate() {
        println!(
            "  {}. [{}] row {} ({})",
            i + 1,
            issue.issue_type,
            issue.row,
            issue.transaction_id.as_deref().unwrap_or("no id")
        );
        println!("     {}", issue.message);
    }
    println!();
}
