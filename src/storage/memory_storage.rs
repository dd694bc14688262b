use crate::models::{FinancialTransaction, Selection};
use crate::storage::{Storage, StorageError, StoredRecord};
use crate::types::TransactionId;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Keeps transactions in a concurrent in-process map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    cache: Arc<DashMap<TransactionId, FinancialTransaction>>
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new())
        }
    }

    pub fn get(&self, id: TransactionId) -> Option<FinancialTransaction> {
        self.cache.get(&id).map(|entry| entry.value().clone())
    }

    fn collect_sorted<F>(&self, predicate: F) -> Vec<StoredRecord>
    where
        F: Fn(&FinancialTransaction) -> bool
    {
        let mut transactions: Vec<_> = self.cache.iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        transactions.sort_by_key(|transaction| transaction.id);
        transactions.into_iter().map(Ok).collect()
    }
}

impl Storage for MemoryStorage {
    async fn select(&self, selection: &Selection) -> Result<Vec<StoredRecord>, StorageError> {
        Ok(self.collect_sorted(|transaction| transaction.matches(selection)))
    }

    async fn update_amount_usd(&self, id: TransactionId, amount_usd: Decimal) -> Result<(), StorageError> {
        let mut transaction = self.cache.get_mut(&id).ok_or(StorageError::NotFound { id })?;
        transaction.amount_usd = amount_usd;
        Ok(())
    }

    async fn insert(&self, transaction: FinancialTransaction) -> Result<(), StorageError> {
        self.cache.insert(transaction.id, transaction);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        Ok(self.collect_sorted(|_| true))
    }

    async fn close(self) -> Result<(), StorageError> {
        Ok(())
    }
}
