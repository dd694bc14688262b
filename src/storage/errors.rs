use thiserror::Error;
use tokio::task::JoinError;

use crate::types::TransactionId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage error: worker failed: {0}")]
    Worker(#[from] JoinError),
    #[error("Storage error: transaction [{id}] has an invalid {column} value '{value}'")]
    InvalidDecimal {
        id: TransactionId,
        column: &'static str,
        value: String
    },
    #[error("Storage error: transaction [{id}] was not found")]
    NotFound {
        id: TransactionId
    },
    #[error("Storage error: connection lock is poisoned")]
    Poisoned
}
