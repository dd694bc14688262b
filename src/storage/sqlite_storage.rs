use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, Params};
use rust_decimal::Decimal;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::models::{FinancialTransaction, Selection};
use crate::storage::{Storage, StorageError, StoredRecord};
use crate::types::{TransactionId, Year};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    amount_ars TEXT NOT NULL,
    exchange_rate TEXT,
    amount_usd TEXT NOT NULL DEFAULT '0'
);

CREATE INDEX IF NOT EXISTS idx_transactions_year ON transactions(year);
";

const SELECT_COLUMNS: &str = "SELECT id, year, amount_ars, exchange_rate, amount_usd FROM transactions";

/// Stores transactions in a SQLite database.
///
/// Decimal columns are kept as TEXT so no precision is lost to floating point. Each call
/// runs on the blocking pool while the caller awaits it.
pub struct SqliteStorage {
    connection: Arc<Mutex<Connection>>
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        debug!("Opening SQLite database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, StorageError> {
        connection.execute_batch(SCHEMA)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection))
        })
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static
    {
        let connection = self.connection.clone();

        spawn_blocking(move || {
            let connection = connection.lock().map_err(|_| StorageError::Poisoned)?;
            operation(&connection)
        })
        .await?
    }
}

/// A row as stored, before its TEXT columns are parsed.
struct StoredRow {
    id: TransactionId,
    year: Year,
    amount_ars: String,
    exchange_rate: Option<String>,
    amount_usd: String
}

impl StoredRow {
    fn into_transaction(self) -> Result<FinancialTransaction, StorageError> {
        let id = self.id;
        let exchange_rate = match self.exchange_rate {
            Some(value) if !value.trim().is_empty() => Some(parse_decimal(id, "exchange_rate", value)?),
            _ => None
        };

        Ok(FinancialTransaction {
            id,
            year: self.year,
            amount_ars: parse_decimal(id, "amount_ars", self.amount_ars)?,
            exchange_rate,
            amount_usd: parse_decimal(id, "amount_usd", self.amount_usd)?
        })
    }
}

fn parse_decimal(id: TransactionId, column: &'static str, value: String) -> Result<Decimal, StorageError> {
    Decimal::from_str(value.trim()).map_err(|_| StorageError::InvalidDecimal { id, column, value })
}

/// Runs a select. Preparing or executing the statement can fail as a whole; reading a single
/// row only fails that row.
fn query_transactions<P: Params>(connection: &Connection, sql: &str, params: P) -> Result<Vec<StoredRecord>, StorageError> {
    let mut statement = connection.prepare(sql)?;
    let rows = statement.query_map(params, |row| {
        Ok(StoredRow {
            id: row.get(0)?,
            year: row.get(1)?,
            amount_ars: row.get(2)?,
            exchange_rate: row.get(3)?,
            amount_usd: row.get(4)?
        })
    })?;

    Ok(rows
        .map(|row| row.map_err(StorageError::from).and_then(StoredRow::into_transaction))
        .collect())
}

impl Storage for SqliteStorage {
    async fn select(&self, selection: &Selection) -> Result<Vec<StoredRecord>, StorageError> {
        let selection = *selection;

        self.with_connection(move |connection| match selection {
            Selection::Year(year) => query_transactions(
                connection,
                &format!("{SELECT_COLUMNS} WHERE year = ?1 ORDER BY id"),
                params![year]
            ),
            //NOTE: The column is TEXT, so '0', '0.00' and '-0' only compare equal once cast.
            Selection::ZeroUsd => query_transactions(
                connection,
                &format!("{SELECT_COLUMNS} WHERE CAST(amount_usd AS REAL) = 0 ORDER BY id"),
                params![]
            )
        })
        .await
    }

    async fn update_amount_usd(&self, id: TransactionId, amount_usd: Decimal) -> Result<(), StorageError> {
        self.with_connection(move |connection| {
            let changed = connection.execute(
                "UPDATE transactions SET amount_usd = ?1 WHERE id = ?2",
                params![amount_usd.to_string(), id]
            )?;

            if changed == 0 {
                return Err(StorageError::NotFound { id });
            }

            Ok(())
        })
        .await
    }

    async fn insert(&self, transaction: FinancialTransaction) -> Result<(), StorageError> {
        self.with_connection(move |connection| {
            connection.execute(
                "INSERT INTO transactions (id, year, amount_ars, exchange_rate, amount_usd)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     year = excluded.year,
                     amount_ars = excluded.amount_ars,
                     exchange_rate = excluded.exchange_rate,
                     amount_usd = excluded.amount_usd",
                params![
                    transaction.id,
                    transaction.year,
                    transaction.amount_ars.to_string(),
                    transaction.exchange_rate.map(|rate| rate.to_string()),
                    transaction.amount_usd.to_string()
                ]
            )?;

            Ok(())
        })
        .await
    }

    async fn all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        self.with_connection(|connection| {
            query_transactions(connection, &format!("{SELECT_COLUMNS} ORDER BY id"), params![])
        })
        .await
    }

    async fn close(self) -> Result<(), StorageError> {
        let mutex = match Arc::try_unwrap(self.connection) {
            Ok(mutex) => mutex,
            Err(_) => {
                //NOTE: A blocking call still holds a clone; the last clone to drop closes the connection.
                warn!("SQLite connection still in use, deferring close");
                return Ok(());
            }
        };

        let connection = mutex.into_inner().map_err(|_| StorageError::Poisoned)?;

        connection.close().map_err(|(_, error)| StorageError::from(error))?;
        debug!("SQLite connection closed");

        Ok(())
    }
}
