pub mod calculator;
pub mod rates;
pub mod report;
pub mod transaction;

// Flat public surface for domain types and functions.
pub use calculator::{TaxCalculator, TaxResult, TaxStatus};
pub use rates::RateTable;
pub use report::{BatchPolicy, CategorySummary, RejectedRecord, SalesReport};
pub use transaction::{ConversionOptions, SalesInput, TaxError, TransactionRecord};
