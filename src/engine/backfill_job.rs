use crate::engine::{BackfillError, BackfillSummary, RecordError};
use crate::models::{FinancialTransaction, Selection};
use crate::storage::Storage;
use tracing::{debug, error, info};

/// Recomputes `amount_usd` for every transaction a selection returns.
///
/// Records are processed strictly one after another in selection order, each point update
/// awaited before the next record is read. There is no enclosing transaction: an interrupted
/// run keeps whatever it already wrote, and re-running it is harmless because the derived
/// value only depends on the record itself.
pub struct BackfillJob<'a, S: Storage> {
    storage: &'a S,
    selection: Selection,
    progress_interval: usize,
    dry_run: bool
}

impl<'a, S: Storage> BackfillJob<'a, S> {
    pub fn new(storage: &'a S, selection: Selection) -> Self {
        Self {
            storage,
            selection,
            progress_interval: selection.default_progress_interval(),
            dry_run: false
        }
    }

    /// Reports progress every `interval` records instead of the selection's default.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Computes and counts without writing anything back.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs one pass over the selection.
    ///
    /// # Errors
    /// Returns `BackfillError` only when the selection itself fails. Failures of individual
    /// records, including rows the store could not read back, are logged and counted as
    /// skipped in the returned summary.
    pub async fn run(&self) -> Result<BackfillSummary, BackfillError> {
        info!("Selecting transactions where {}", self.selection);

        let records = self.storage.select(&self.selection).await
            .map_err(|source| BackfillError::Selection { selection: self.selection, source })?;

        let total = records.len();
        let mut summary = BackfillSummary::new(self.selection, total, self.dry_run);

        info!("Found {total} transactions to process");

        for (index, record) in records.into_iter().enumerate() {
            let outcome = match record {
                Ok(transaction) => self.process(&transaction).await.map(|changed| (transaction.year, changed)),
                Err(error) => Err(RecordError::unreadable(error))
            };

            match outcome {
                Ok((year, changed)) => summary.record_update(year, changed),
                Err(error) => {
                    error!("{error}");
                    summary.record_skip();
                }
            }

            let processed = index + 1;

            if processed % self.progress_interval == 0 || processed == total {
                info!("Processed {processed}/{total}");
            }
        }

        Ok(summary)
    }

    /// Returns whether the derived value differs from the stored one.
    async fn process(&self, transaction: &FinancialTransaction) -> Result<bool, RecordError> {
        let amount_usd = transaction.expected_amount_usd()
            .map_err(|error| RecordError::conversion(transaction, error))?;
        let changed = amount_usd != transaction.amount_usd;

        if self.dry_run {
            debug!("Transaction [{}] would be set to {amount_usd} USD (currently {})", transaction.id, transaction.amount_usd);
            return Ok(changed);
        }

        //NOTE: Unconditional overwrite. A concurrent writer between select and update loses (last write wins).
        self.storage.update_amount_usd(transaction.id, amount_usd).await
            .map_err(|error| RecordError::update(transaction, error))?;

        debug!("Transaction [{}] set to {amount_usd} USD (was {})", transaction.id, transaction.amount_usd);

        Ok(changed)
    }
}
