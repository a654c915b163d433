//! AML Risk Scorer - Main Entry Point
//!
//! Loads the risk model, connects the graph feature store and serves the
//! scoring API until interrupted.

use anyhow::{Context, Result};
use aml_risk_scorer::{
    api,
    config::AppConfig,
    feature_assembler::FeatureAssembler,
    feature_store::{backend_from_config, FeatureStoreClient},
    metrics::{MetricsReporter, PipelineMetrics},
    models::ModelLoader,
    orchestrator::ScoringService,
    telemetry,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aml-risk-scorer", about = "Graph-centrality AML risk scoring service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load_from_path(&args.config)?;
    telemetry::init(&config.logging)?;

    info!("Starting AML Risk Scorer");
    info!(
        backend = ?config.graph.backend,
        timeout_ms = config.graph.timeout_ms,
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // A missing or unreadable model is fatal.
    let engine = ModelLoader::with_threads(config.model.onnx_threads)
        .load(&config.model.path)
        .with_context(|| format!("Failed to load risk model from {}", config.model.path.display()))?;
    let engine = Arc::new(engine);

    let backend = backend_from_config(&config.graph)?;
    let client = Arc::new(FeatureStoreClient::new(
        backend,
        &config.graph,
        &config.cache,
        metrics.clone(),
    ));

    let service = ScoringService::new(client, FeatureAssembler::new(), engine, metrics.clone())
        .context("Model schema does not match the feature assembler")?;
    let service = Arc::new(service);

    let health = service.health().await;
    if !health.graph_backend_reachable {
        warn!("Graph backend unreachable at startup, lookups will fall back to cold-start features");
    }

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = api::router(service, config.server.request_timeout());
    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(address = %config.server.bind, "Listening for score requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await
        .context("HTTP server failed")?;

    info!("Risk scorer shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
