use rust_decimal::Decimal;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use std::str::FromStr;

/// Per-record failure. The calculator reports these and never swallows them;
/// the caller decides whether to skip the record or abort the batch.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("category not found: '{0}'")]
    UnknownCategory(String),
    #[error("invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("amount out of range: '{0}'")]
    AmountOutOfRange(String),
}

/// A single sale, ready for tax calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: Option<String>,
    pub amount: Decimal,
    pub category: String,
}

/// Unified JSON input format
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SalesInput {
    pub transactions: Vec<TransactionRecord>,
}

/// Raw sales record as found in the input file.
///
/// The amount is kept as text so that a malformed value rejects only its own
/// record instead of failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionRecord {
    /// Identifier shown in reports
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Sale amount before tax, as a decimal string (e.g. "100.00") or a JSON
    /// number. Strings keep every digit as written.
    #[schemars(schema_with = "amount_schema")]
    pub amount: String,
    /// Tax category; must exist in the rate table
    #[serde(default)]
    pub category: Option<String>,
}

fn amount_schema(_: &mut schemars::gen::SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(vec![InstanceType::String, InstanceType::Number].into()),
        ..Default::default()
    }
    .into()
}

#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// Category applied to records whose category is blank
    pub default_category: Option<String>,
}

impl TransactionRecord {
    pub fn to_transaction(&self, options: &ConversionOptions) -> Result<Transaction, TaxError> {
        let raw_amount = self.amount.trim();
        let amount = Decimal::from_str(raw_amount)
            .map_err(|_| TaxError::InvalidAmount(raw_amount.to_string()))?;
        if amount < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(raw_amount.to_string()));
        }

        let category = match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category.to_string(),
            _ => options
                .default_category
                .clone()
                .ok_or_else(|| TaxError::UnknownCategory(String::new()))?,
        };

        Ok(Transaction {
            id: self.transaction_id.clone(),
            amount,
            category,
        })
    }
}

/// Read raw sales records from CSV
pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records: Result<Vec<TransactionRecord>, _> =
        rdr.deserialize::<TransactionRecord>().collect();
    let records = records?;
    log::info!("Read {} sales records", records.len());
    Ok(records)
}

/// Read raw sales records from JSON.
///
/// Numeric amounts are taken as their JSON text, so `100.5` and `"100.5"` load
/// the same record.
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<TransactionRecord>> {
    let mut value: Value = serde_json::from_reader(reader)?;
    if let Some(transactions) = value.get_mut("transactions").and_then(Value::as_array_mut) {
        for amount in transactions.iter_mut().filter_map(|tx| tx.get_mut("amount")) {
            if amount.is_number() {
                *amount = Value::String(amount.to_string());
            }
        }
    }
    let input: SalesInput = serde_json::from_value(value)?;
    log::info!("Read {} sales records", input.transactions.len());
    Ok(input.transactions)
}
