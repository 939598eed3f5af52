use super::rates::{normalize_category, RateTable};
use super::transaction::{TaxError, Transaction};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Minor-unit precision of the reporting currency
pub const CURRENCY_DP: u32 = 2;

/// Round to currency precision, half-up.
///
/// The result always carries exactly [`CURRENCY_DP`] decimal places, so a
/// zero tax prints as `0.00` rather than `0`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_DP);
    rounded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaxStatus {
    Taxable,
    #[serde(rename = "Tax-Exempt")]
    Exempt,
}

impl TaxStatus {
    pub fn for_rate(rate: Decimal) -> Self {
        if rate.is_zero() {
            TaxStatus::Exempt
        } else {
            TaxStatus::Taxable
        }
    }
}

impl fmt::Display for TaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxStatus::Taxable => write!(f, "Taxable"),
            TaxStatus::Exempt => write!(f, "Tax-Exempt"),
        }
    }
}

/// Outcome of applying the rate table to one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxResult {
    pub transaction: Transaction,
    pub rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl TaxResult {
    pub fn status(&self) -> TaxStatus {
        TaxStatus::for_rate(self.rate)
    }
}

/// Compute tax and total for a single sale.
///
/// `tax = amount * rate` and `total = amount + tax`, both rounded half-up to
/// two decimal places. Fails with [`TaxError::InvalidAmount`] for a negative
/// amount, [`TaxError::UnknownCategory`] when the category has no rate and
/// [`TaxError::AmountOutOfRange`] when the total does not fit in a `Decimal`.
pub fn compute(amount: Decimal, category: &str, rates: &RateTable) -> Result<TaxResult, TaxError> {
    if amount < Decimal::ZERO {
        return Err(TaxError::InvalidAmount(amount.to_string()));
    }

    let category = normalize_category(category);
    let rate = rates
        .rate(&category)
        .ok_or_else(|| TaxError::UnknownCategory(category.clone()))?;

    let out_of_range = || TaxError::AmountOutOfRange(amount.to_string());
    let tax = round_currency(amount.checked_mul(rate).ok_or_else(out_of_range)?);
    let total = round_currency(amount.checked_add(tax).ok_or_else(out_of_range)?);

    Ok(TaxResult {
        transaction: Transaction {
            id: None,
            amount,
            category,
        },
        rate,
        tax,
        total,
    })
}

/// Owns the rate table for a run and applies it to transactions
#[derive(Debug, Clone, Default)]
pub struct TaxCalculator {
    rates: RateTable,
}

impl TaxCalculator {
    pub fn new(rates: RateTable) -> Self {
        TaxCalculator { rates }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn compute_transaction(&self, transaction: Transaction) -> Result<TaxResult, TaxError> {
        let mut result = compute(transaction.amount, &transaction.category, &self.rates)?;
        result.transaction.id = transaction.id;

        log::debug!(
            "{}: {} {} @ {} = tax {}, total {}",
            result.transaction.id.as_deref().unwrap_or("-"),
            result.transaction.category,
            result.transaction.amount,
            result.rate,
            result.tax,
            result.total
        );
        Ok(result)
    }
}
