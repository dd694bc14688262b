mod backfill_job;
mod errors;
mod summary;
#[cfg(test)]
mod tests;

pub use backfill_job::BackfillJob;
pub use errors::{BackfillError, RecordError};
pub use summary::BackfillSummary;
