//! Training Dataset Builder
//!
//! Joins a labeled transaction ledger with an exported account feature
//! snapshot and writes one feature row per transaction.

use anyhow::Result;
use aml_risk_scorer::{
    config::LoggingConfig,
    dataset::{read_account_snapshot, read_ledger, write_training_csv, DatasetBuilder},
    feature_assembler::FeatureAssembler,
    telemetry,
    types::AccountFeatures,
};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "build-dataset", about = "Build a training CSV from a ledger and account features")]
struct Args {
    /// Labeled transaction ledger (PaySim columns)
    #[arg(long, default_value = "data/sample_transactions.csv")]
    ledger: PathBuf,

    /// Account feature snapshot exported from the graph
    #[arg(long, default_value = "data/account_features.csv")]
    accounts: PathBuf,

    /// Destination training CSV
    #[arg(short, long, default_value = "data/training.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(&LoggingConfig::default())?;

    let accounts: HashMap<String, AccountFeatures> = read_account_snapshot(&args.accounts)?
        .into_iter()
        .map(|record| (record.id, record.features))
        .collect();
    info!(accounts = accounts.len(), path = %args.accounts.display(), "Account features loaded");

    let ledger = read_ledger(&args.ledger)?;
    info!(transactions = ledger.len(), path = %args.ledger.display(), "Ledger loaded");

    let dataset = DatasetBuilder::new(FeatureAssembler::new()).build(&ledger, &accounts);
    write_training_csv(&dataset.rows, &args.output)?;

    let stats = &dataset.stats;
    let fraud_rate = if stats.rows > 0 {
        stats.fraud_rows as f64 / stats.rows as f64 * 100.0
    } else {
        0.0
    };
    info!(
        rows = stats.rows,
        fraud_rate = format!("{fraud_rate:.2}%"),
        cold_start_sources = stats.cold_start_sources,
        cold_start_destinations = stats.cold_start_destinations,
        output = %args.output.display(),
        "Training dataset written"
    );

    Ok(())
}
