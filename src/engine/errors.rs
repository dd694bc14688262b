use crate::models::{FinancialTransaction, Selection};
use crate::storage::StorageError;
use crate::types::{ConversionError, TransactionId, Year};
use thiserror::Error;

/// A failure confined to one record. The run logs it, counts it as skipped and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Skipping unreadable transaction: {source}")]
    Unreadable {
        #[source]
        source: StorageError
    },
    #[error("Skipping transaction [{id}] of year [{year}]: {source}")]
    Conversion {
        id: TransactionId,
        year: Year,
        #[source]
        source: ConversionError
    },
    #[error("Skipping transaction [{id}] of year [{year}]: update failed: {source}")]
    Update {
        id: TransactionId,
        year: Year,
        #[source]
        source: StorageError
    }
}

impl RecordError {
    pub fn unreadable(source: StorageError) -> Self {
        Self::Unreadable { source }
    }

    pub fn conversion(tx: &FinancialTransaction, source: ConversionError) -> Self {
        Self::Conversion { id: tx.id, year: tx.year, source }
    }

    pub fn update(tx: &FinancialTransaction, source: StorageError) -> Self {
        Self::Update { id: tx.id, year: tx.year, source }
    }
}

/// A failure that aborts the whole run.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Backfill error: selecting transactions where {selection} failed: {source}")]
    Selection {
        selection: Selection,
        #[source]
        source: StorageError
    }
}
