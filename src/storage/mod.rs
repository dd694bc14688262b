mod errors;
mod memory_storage;
mod sqlite_storage;

use std::future::Future;

use rust_decimal::Decimal;

use crate::models::{FinancialTransaction, Selection};
use crate::types::TransactionId;

pub use errors::StorageError;
pub use memory_storage::MemoryStorage;
pub use sqlite_storage::SqliteStorage;

/// One stored row: the transaction, or why it could not be read back.
pub type StoredRecord = Result<FinancialTransaction, StorageError>;

/// The backing store a backfill reads from and writes to.
///
/// Only equality selection and single-field point updates are required of an implementation.
/// Every call is a round-trip the caller awaits before issuing the next one.
pub trait Storage: Send + Sync + 'static {
    /// Returns the transactions matching `selection`, ordered by id.
    ///
    /// The outer error means the query itself failed. A row that matched but cannot be read
    /// back comes out as an `Err` entry of its own, so the healthy rows are still returned.
    fn select(&self, selection: &Selection) -> impl Future<Output = Result<Vec<StoredRecord>, StorageError>> + Send;

    /// Overwrites `amount_usd` of a single transaction, leaving every other field untouched.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if no transaction has the given id.
    fn update_amount_usd(&self, id: TransactionId, amount_usd: Decimal) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Inserts a transaction, replacing any existing one with the same id.
    fn insert(&self, transaction: FinancialTransaction) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Returns every stored transaction, ordered by id, with unreadable rows as `Err` entries.
    fn all(&self) -> impl Future<Output = Result<Vec<StoredRecord>, StorageError>> + Send;

    /// Releases the underlying connection.
    fn close(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
