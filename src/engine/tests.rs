use super::{BackfillError, BackfillJob};

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use tempfile::TempDir;

use crate::models::{FinancialTransaction, Selection};
use crate::storage::{MemoryStorage, SqliteStorage, Storage, StorageError, StoredRecord};
use crate::types::TransactionId;

/// Wraps an in-memory store and fails selected calls on demand.
struct FaultyStorage {
    inner: MemoryStorage,
    failing_updates: HashSet<TransactionId>,
    fail_select: bool
}

impl FaultyStorage {
    fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            failing_updates: HashSet::new(),
            fail_select: false
        }
    }
}

impl Storage for FaultyStorage {
    async fn select(&self, selection: &Selection) -> Result<Vec<StoredRecord>, StorageError> {
        if self.fail_select {
            return Err(StorageError::Poisoned);
        }

        self.inner.select(selection).await
    }

    async fn update_amount_usd(&self, id: TransactionId, amount_usd: Decimal) -> Result<(), StorageError> {
        if self.failing_updates.contains(&id) {
            return Err(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }

        self.inner.update_amount_usd(id, amount_usd).await
    }

    async fn insert(&self, transaction: FinancialTransaction) -> Result<(), StorageError> {
        self.inner.insert(transaction).await
    }

    async fn all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        self.inner.all().await
    }

    async fn close(self) -> Result<(), StorageError> {
        self.inner.close().await
    }
}

fn create_transaction(id: i64, year: i32, amount_ars: &str, exchange_rate: &str) -> Result<FinancialTransaction> {
    Ok(FinancialTransaction::new(id, year, Decimal::from_str(amount_ars)?, Some(Decimal::from_str(exchange_rate)?)))
}

async fn create_storage(transactions: Vec<FinancialTransaction>) -> Result<MemoryStorage> {
    let storage = MemoryStorage::new();

    for transaction in transactions {
        storage.insert(transaction).await?;
    }

    Ok(storage)
}

async fn create_scenario_storage() -> Result<MemoryStorage> {
    create_storage(vec![
        create_transaction(1, 2022, "1000", "100")?,
        create_transaction(2, 2022, "500", "0")?,
        create_transaction(3, 2023, "2000", "200")?
    ]).await
}

async fn stored_transactions<S: Storage>(storage: &S) -> Result<Vec<FinancialTransaction>> {
    Ok(storage.all().await?.into_iter().collect::<Result<Vec<_>, _>>()?)
}

fn amount_usd(storage: &MemoryStorage, id: TransactionId) -> Result<Decimal> {
    storage.get(id)
        .map(|transaction| transaction.amount_usd)
        .ok_or_else(|| anyhow!("Transaction {id} missing from storage"))
}

#[tokio::test]
async fn test_year_backfill_updates_only_that_year() -> Result<()> {
    let storage = create_scenario_storage().await?;
    let untouched = storage.get(3).ok_or_else(|| anyhow!("Transaction 3 missing from storage"))?;

    let summary = BackfillJob::new(&storage, Selection::Year(2022)).run().await?;

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 0);
    assert!(summary.updated_by_year.is_empty());
    assert_eq!(amount_usd(&storage, 1)?, Decimal::from(10));
    assert!(amount_usd(&storage, 2)?.is_zero());
    assert_eq!(storage.get(3), Some(untouched));

    Ok(())
}

#[tokio::test]
async fn test_backfill_leaves_every_processed_record_consistent() -> Result<()> {
    let storage = create_storage(vec![
        create_transaction(1, 2020, "123.45", "3.7")?,
        create_transaction(2, 2021, "-88", "12.5")?,
        create_transaction(3, 2022, "999999.99", "0.0001")?,
        FinancialTransaction::new(4, 2022, Decimal::from(70), None)
    ]).await?;

    let summary = BackfillJob::new(&storage, Selection::ZeroUsd).run().await?;

    assert_eq!(summary.updated, 4);

    for transaction in stored_transactions(&storage).await? {
        assert_eq!(transaction.amount_usd, transaction.expected_amount_usd()?, "transaction {}", transaction.id);
    }

    Ok(())
}

#[tokio::test]
async fn test_rerunning_backfill_changes_nothing() -> Result<()> {
    let storage = create_scenario_storage().await?;
    let job = BackfillJob::new(&storage, Selection::Year(2022));

    let first = job.run().await?;
    let after_first = stored_transactions(&storage).await?;
    let second = job.run().await?;
    let after_second = stored_transactions(&storage).await?;

    assert_eq!(after_first, after_second);
    assert_eq!(first.changed, 1);
    assert_eq!(second.updated, 2);
    assert_eq!(second.changed, 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_updates_are_skipped_without_aborting_the_run() -> Result<()> {
    let inner = create_storage(vec![
        create_transaction(1, 2022, "1000", "100")?,
        create_transaction(2, 2022, "500", "5")?,
        create_transaction(3, 2023, "2000", "200")?,
        create_transaction(4, 2023, "400", "4")?
    ]).await?;

    let mut storage = FaultyStorage::new(inner.clone());
    storage.failing_updates.insert(2);
    storage.failing_updates.insert(3);

    let summary = BackfillJob::new(&storage, Selection::ZeroUsd).run().await?;

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.updated_by_year.get(&2022), Some(&1));
    assert_eq!(summary.updated_by_year.get(&2023), Some(&1));
    assert_eq!(amount_usd(&inner, 1)?, Decimal::from(10));
    assert!(amount_usd(&inner, 2)?.is_zero());
    assert!(amount_usd(&inner, 3)?.is_zero());
    assert_eq!(amount_usd(&inner, 4)?, Decimal::from(100));

    Ok(())
}

#[tokio::test]
async fn test_empty_selection_completes_with_zero_totals() -> Result<()> {
    let storage = create_scenario_storage().await?;

    let summary = BackfillJob::new(&storage, Selection::Year(1999)).run().await?;

    assert_eq!(summary.selected, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 0);
    assert!(summary.updated_by_year.is_empty());
    assert!(!summary.to_string().contains("updated by year"));

    let empty_storage = MemoryStorage::new();
    let summary = BackfillJob::new(&empty_storage, Selection::ZeroUsd).run().await?;

    assert_eq!(summary.selected, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 0);
    assert!(summary.updated_by_year.is_empty());
    assert_eq!(
        summary.to_string(),
        "Backfill summary (amount_usd == 0)\n  selected: 0\n  updated:  0\n  changed:  0\n  skipped:  0\n  updated by year: none"
    );

    Ok(())
}

#[tokio::test]
async fn test_cross_year_summary_lists_years_in_ascending_order() -> Result<()> {
    let storage = create_storage(vec![
        create_transaction(1, 2023, "100", "10")?,
        create_transaction(2, 2021, "100", "10")?,
        create_transaction(3, 2023, "100", "10")?,
        create_transaction(4, 2022, "100", "10")?
    ]).await?;

    let summary = BackfillJob::new(&storage, Selection::ZeroUsd).run().await?;
    let years: Vec<_> = summary.updated_by_year.iter().map(|(year, count)| (*year, *count)).collect();

    assert_eq!(years, vec![(2021, 1), (2022, 1), (2023, 2)]);
    assert!(summary.to_string().ends_with("updated by year:\n    2021: 1\n    2022: 1\n    2023: 2"));

    Ok(())
}

#[tokio::test]
async fn test_overflowing_conversion_is_skipped() -> Result<()> {
    let overflowing = FinancialTransaction::new(1, 2022, Decimal::MAX, Some(Decimal::new(1, 10)));
    let storage = create_storage(vec![overflowing, create_transaction(2, 2022, "1000", "100")?]).await?;

    let summary = BackfillJob::new(&storage, Selection::Year(2022)).run().await?;

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 1);
    assert!(amount_usd(&storage, 1)?.is_zero());
    assert_eq!(amount_usd(&storage, 2)?, Decimal::from(10));

    Ok(())
}

#[tokio::test]
async fn test_dry_run_counts_without_writing() -> Result<()> {
    let storage = create_scenario_storage().await?;
    let before = stored_transactions(&storage).await?;

    let summary = BackfillJob::new(&storage, Selection::ZeroUsd)
        .with_dry_run(true)
        .run()
        .await?;

    assert!(summary.dry_run);
    assert_eq!(summary.updated, 3);
    assert_eq!(summary.changed, 2);
    assert_eq!(stored_transactions(&storage).await?, before);

    Ok(())
}

#[tokio::test]
async fn test_selection_failure_aborts_the_run() -> Result<()> {
    let mut storage = FaultyStorage::new(create_scenario_storage().await?);
    storage.fail_select = true;

    let result = BackfillJob::new(&storage, Selection::ZeroUsd).run().await;

    assert!(matches!(result, Err(BackfillError::Selection { selection: Selection::ZeroUsd, .. })));

    Ok(())
}

#[tokio::test]
async fn test_zero_progress_interval_does_not_panic() -> Result<()> {
    let storage = create_scenario_storage().await?;

    let summary = BackfillJob::new(&storage, Selection::ZeroUsd)
        .with_progress_interval(0)
        .run()
        .await?;

    assert_eq!(summary.updated, 3);

    Ok(())
}

async fn create_sqlite_database(directory: &TempDir, transactions: Vec<FinancialTransaction>) -> Result<std::path::PathBuf> {
    let path = directory.path().join("finance.db");
    let storage = SqliteStorage::open(&path)?;

    for transaction in transactions {
        storage.insert(transaction).await?;
    }

    storage.close().await?;

    Ok(path)
}

#[tokio::test]
async fn test_unreadable_stored_row_is_skipped_without_aborting_the_run() -> Result<()> {
    let directory = TempDir::new()?;
    let path = create_sqlite_database(&directory, vec![
        create_transaction(1, 2022, "1000", "100")?,
        create_transaction(2, 2022, "500", "5")?
    ]).await?;

    let connection = rusqlite::Connection::open(&path)?;
    connection.execute("UPDATE transactions SET exchange_rate = 'n/a' WHERE id = 2", [])?;
    drop(connection);

    let storage = SqliteStorage::open(&path)?;
    let summary = BackfillJob::new(&storage, Selection::Year(2022)).run().await?;

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 1);

    let healthy = storage.select(&Selection::Year(2022)).await?
        .into_iter()
        .find_map(|record| record.ok())
        .ok_or_else(|| anyhow!("Transaction 1 missing from storage"))?;

    assert_eq!(healthy.id, 1);
    assert_eq!(healthy.amount_usd, Decimal::from(10));

    storage.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_store_closes_cleanly_after_a_failed_selection() -> Result<()> {
    let directory = TempDir::new()?;
    let path = create_sqlite_database(&directory, vec![create_transaction(1, 2022, "1000", "100")?]).await?;
    let storage = SqliteStorage::open(&path)?;

    let connection = rusqlite::Connection::open(&path)?;
    connection.execute("DROP TABLE transactions", [])?;
    drop(connection);

    let result = BackfillJob::new(&storage, Selection::Year(2022)).run().await;

    assert!(matches!(result, Err(BackfillError::Selection { source: StorageError::Sqlite(_), .. })));

    storage.close().await?;

    Ok(())
}
