use std::io::{stderr, stdout, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use usd_backfill::cli::{BackfillArgs, Cli, Commands};
use usd_backfill::engine::{BackfillJob, BackfillSummary};
use usd_backfill::storage::{SqliteStorage, Storage};
use usd_backfill::transfer;

#[tokio::main]
async fn main() -> ExitCode {
    //NOTE: A missing .env file is the normal case, configuration then comes from flags and the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_logging(parse_log_level(&cli.log_level));

    let timer = Instant::now();
    let result = match &cli.command {
        Commands::Backfill(args) => run_backfill(&cli.database, args).await,
        Commands::Import { file } => run_import(&cli.database, file).await,
        Commands::Export => run_export(&cli.database).await
    };

    info!("Finished in: {:?}", timer.elapsed());

    //NOTE: The status line goes to stderr so `export` output stays valid CSV.
    match result {
        Ok(()) => {
            eprintln!("Done");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("{error:#}");
            eprintln!("Failed: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::INFO
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the summary and exported CSV, so logging goes to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn open_storage(database: &Path) -> Result<SqliteStorage> {
    SqliteStorage::open(database)
        .with_context(|| format!("Could not open database at {}", database.display()))
}

/// Closes the store on every exit path of a command. A failed close is logged, not fatal.
async fn close_storage<S: Storage>(storage: S) {
    if let Err(error) = storage.close().await {
        warn!("Database was not closed cleanly: {error}");
    }
}

async fn run_backfill(database: &Path, args: &BackfillArgs) -> Result<()> {
    let storage = open_storage(database)?;

    let mut job = BackfillJob::new(&storage, args.selection()).with_dry_run(args.dry_run);

    if let Some(interval) = args.progress_every {
        job = job.with_progress_interval(interval);
    }

    let result = job.run().await;

    close_storage(storage).await;

    write_summary_to_stdout(&result?)
}

async fn run_import(database: &Path, file: &Path) -> Result<()> {
    let storage = open_storage(database)?;
    let result = transfer::import_csv(&storage, file).await;

    close_storage(storage).await;

    let summary = result?;
    let mut output = stdout().lock();

    writeln!(output, "Imported {} transactions ({} rejected)", summary.imported, summary.rejected)?;

    Ok(())
}

async fn run_export(database: &Path) -> Result<()> {
    let storage = open_storage(database)?;
    let result = storage.all().await;

    close_storage(storage).await;

    let transactions = transfer::readable_records(result?);

    transfer::export_csv(BufWriter::new(stdout().lock()), &transactions)
}

fn write_summary_to_stdout(summary: &BackfillSummary) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "{summary}")?;

    output.flush()?;

    Ok(())
}
