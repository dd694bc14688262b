use crate::models::FinancialTransaction;
use crate::storage::{Storage, StoredRecord};
use anyhow::Context;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{error, info};

const HEADER: [&str; 5] = ["id", "year", "amount_ars", "exchange_rate", "amount_usd"];

/// Outcome of loading a CSV file into a store.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: usize
}

/// Loads every well-formed row of the CSV file at `path` into `storage`.
///
/// Expects the header `id,year,amount_ars,exchange_rate,amount_usd`. An empty `exchange_rate`
/// means no rate is known, and the `amount_usd` column may be left out entirely. Malformed rows
/// and rows the store refuses are logged and counted as rejected.
///
/// # Errors
/// Fails if the file cannot be opened.
pub async fn import_csv<S: Storage>(storage: &S, path: &Path) -> anyhow::Result<ImportSummary> {
    let path_buf = path.to_path_buf();
    let (transactions, malformed) = spawn_blocking(move || read_transactions(path_buf)).await??;

    let mut summary = ImportSummary {
        imported: 0,
        rejected: malformed
    };

    for transaction in transactions {
        let id = transaction.id;

        match storage.insert(transaction).await {
            Ok(()) => summary.imported += 1,
            Err(error) => {
                error!("Could not store transaction [{id}]: {error}");
                summary.rejected += 1;
            }
        }
    }

    info!("Imported {} transactions from {} ({} rejected)", summary.imported, path.display(), summary.rejected);

    Ok(summary)
}

fn read_transactions(path: PathBuf) -> anyhow::Result<(Vec<FinancialTransaction>, usize)> {
    let file = File::open(&path).with_context(|| format!("Error opening CSV at path: {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut transactions = Vec::new();
    let mut malformed = 0;

    for result in reader.deserialize::<FinancialTransaction>() {
        match result {
            Ok(transaction) => transactions.push(transaction),
            Err(error) => {
                error!("CSV deserialization error: {error}");
                malformed += 1;
            }
        }
    }

    Ok((transactions, malformed))
}

/// Keeps the rows the store could read back, logging each one it could not.
pub fn readable_records(records: Vec<StoredRecord>) -> Vec<FinancialTransaction> {
    records.into_iter()
        .filter_map(|record| match record {
            Ok(transaction) => Some(transaction),
            Err(error) => {
                error!("Leaving out unreadable transaction: {error}");
                None
            }
        })
        .collect()
}

/// Writes `transactions` as CSV, header included, in the same layout `import_csv` reads.
pub fn export_csv<W: Write>(writer: W, transactions: &[FinancialTransaction]) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    //NOTE: `serialize` only emits the header alongside the first row.
    if transactions.is_empty() {
        writer.write_record(HEADER)?;
    }

    for transaction in transactions {
        writer.serialize(transaction)?;
    }

    writer.flush()?;

    Ok(())
}
