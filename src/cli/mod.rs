
use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::models::Selection;
use crate::types::Year;

/// Keeps the derived USD amount of financial transactions in line with their ARS amount and
/// exchange rate.
#[derive(Parser, Debug)]
#[command(name = "usd-backfill", version, about, long_about = None)]
pub struct Cli {
    /// File path to the SQLite transaction database.
    #[arg(long, global = true, env = "BACKFILL_DATABASE", default_value = "finance.db")]
    pub database: PathBuf,

    /// Log verbosity: error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recompute amount_usd for the selected transactions.
    Backfill(BackfillArgs),
    /// Load transactions from a CSV file into the database, replacing rows with the same id.
    Import {
        /// Path to a CSV file with the columns id,year,amount_ars,exchange_rate[,amount_usd]
        file: PathBuf
    },
    /// Write every transaction in the database to stdout as CSV.
    Export
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("selection").required(true).args(["year", "all_zero"])))]
pub struct BackfillArgs {
    /// Repair every transaction of this accounting year.
    #[arg(long)]
    pub year: Option<Year>,

    /// Repair every transaction whose USD amount is zero, across all years.
    #[arg(long)]
    pub all_zero: bool,

    /// Report progress every N records (default: 20 for --year, 50 for --all-zero).
    #[arg(long, value_name = "N")]
    pub progress_every: Option<usize>,

    /// Compute and report without writing anything back.
    #[arg(long)]
    pub dry_run: bool
}

impl BackfillArgs {
    pub fn selection(&self) -> Selection {
        match self.year {
            Some(year) => Selection::Year(year),
            None => Selection::ZeroUsd
        }
    }
}
