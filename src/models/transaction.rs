use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Selection;
use crate::types::{to_usd, ConversionError, TransactionId, Year};

/// A single financial transaction as held by the backing store.
///
/// Transactions are created and edited elsewhere; the backfill only ever rewrites
/// `amount_usd`, which is derived from `amount_ars` and `exchange_rate`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FinancialTransaction {
    /// Unique identifier assigned by the store.
    pub id: TransactionId,
    /// The accounting year the transaction belongs to.
    pub year: Year,
    /// Amount in the local currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_ars: Decimal,
    /// Local-currency units per USD. Missing or zero for incomplete historical data.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub exchange_rate: Option<Decimal>,
    /// Derived USD amount.
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount_usd: Decimal
}

impl FinancialTransaction {
    /// Creates a transaction whose USD amount has not been populated yet.
    pub fn new(id: TransactionId, year: Year, amount_ars: Decimal, exchange_rate: Option<Decimal>) -> Self {
        Self {
            id,
            year,
            amount_ars,
            exchange_rate,
            amount_usd: Decimal::ZERO
        }
    }

    pub fn with_amount_usd(mut self, amount_usd: Decimal) -> Self {
        self.amount_usd = amount_usd;
        self
    }

    /// The value `amount_usd` must hold for this record to be consistent.
    pub fn expected_amount_usd(&self) -> Result<Decimal, ConversionError> {
        to_usd(self.amount_ars, self.exchange_rate)
    }

    pub fn matches(&self, selection: &Selection) -> bool {
        match selection {
            Selection::Year(year) => self.year == *year,
            Selection::ZeroUsd => self.amount_usd.is_zero()
        }
    }
}
