//! Schema command - print expected input formats

use crate::tax::SalesInput;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the sales input format
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions, for sales and rate files
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(SalesInput);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => println!("{}", csv_header()),
            SchemaFormat::CsvFields => print_fields(),
        }
        Ok(())
    }
}

fn csv_header() -> String {
    SALES_FIELDS
        .iter()
        .map(|(name, _, _)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

fn print_fields() {
    println!("Sales CSV Format");
    println!("================");
    print_field_table(SALES_FIELDS);
    println!();
    println!("Rate CSV Format (--rates)");
    println!("=========================");
    print_field_table(RATE_FIELDS);
    println!();
    println!("Rates are fractions between 0 and 1 (0.10 = 10%)");
}

fn print_field_table(fields: &[(&str, bool, &str)]) {
    for (name, required, description) in fields {
        let req = if *required { "required" } else { "optional" };
        println!("{:16} ({:8})  {}", name, req, description);
    }
}

const SALES_FIELDS: &[(&str, bool, &str)] = &[
    ("transaction_id", false, "Identifier shown in reports"),
    ("amount", true, "Sale amount before tax (non-negative decimal)"),
    (
        "category",
        true,
        "Tax category; blank uses --default-category if given",
    ),
];

const RATE_FIELDS: &[(&str, bool, &str)] = &[
    ("category", true, "Tax category name (case-insensitive)"),
    ("rate", true, "Tax rate as a fraction"),
];
