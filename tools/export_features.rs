//! Account Feature Exporter
//!
//! Dumps every account's centrality attributes from Neo4j into a snapshot
//! CSV usable by the snapshot backend and the dataset builder.

use anyhow::{Context, Result};
use aml_risk_scorer::{
    config::AppConfig, dataset::write_account_snapshot, feature_store::Neo4jBackend, telemetry,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "export-features", about = "Export account centrality attributes from Neo4j")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Destination snapshot CSV
    #[arg(short, long, default_value = "data/account_features.csv")]
    output: PathBuf,

    /// Deadline for the export query, replaces graph.timeout_ms
    #[arg(long, default_value_t = 60_000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load_from_path(&args.config)?;
    telemetry::init(&config.logging)?;

    config.graph.timeout_ms = args.timeout_ms;
    let backend = Neo4jBackend::new(&config.graph).context("Failed to create Neo4j client")?;

    let records = backend
        .export_accounts()
        .await
        .context("Failed to export accounts from Neo4j")?;
    write_account_snapshot(&records, &args.output)?;

    info!(
        accounts = records.len(),
        output = %args.output.display(),
        "Account feature snapshot written"
    );
    Ok(())
}
