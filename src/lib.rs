//! Recomputes the derived USD amount of financial transactions.
//!
//! A backfill selects transactions either by accounting year or by an unpopulated USD amount,
//! derives `amount_usd = amount_ars / exchange_rate` for each one and writes it back with a
//! point update. See [`engine::BackfillJob`].

pub mod cli;
pub mod engine;
pub mod models;
pub mod storage;
pub mod transfer;
pub mod types;
