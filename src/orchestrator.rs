//! Scoring orchestrator
//!
//! Drives one request through validation, concurrent account lookups,
//! vector assembly and inference. Feature fallbacks never fail a request;
//! only invalid input and model failures do.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{SchemaMismatch, ScoreError};
use crate::feature_assembler::FeatureAssembler;
use crate::feature_store::FeatureStoreClient;
use crate::metrics::PipelineMetrics;
use crate::models::RiskScoringEngine;
use crate::schema::FeatureVector;
use crate::types::{FeatureOrigin, ScoreRequest, Transaction};

/// Result of scoring one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutcome {
    pub probability: f64,
    pub source_origin: FeatureOrigin,
    pub destination_origin: FeatureOrigin,
    pub vector: FeatureVector,
}

/// Readiness of the service's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub graph_backend_reachable: bool,
    pub model_loaded: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.graph_backend_reachable && self.model_loaded
    }
}

/// Owns the feature store client and the loaded model for the process.
pub struct ScoringService {
    client: Arc<FeatureStoreClient>,
    assembler: FeatureAssembler,
    engine: Arc<RiskScoringEngine>,
    metrics: Arc<PipelineMetrics>,
}

impl ScoringService {
    /// Wire the service, refusing a model whose schema differs from the
    /// assembler's.
    pub fn new(
        client: Arc<FeatureStoreClient>,
        assembler: FeatureAssembler,
        engine: Arc<RiskScoringEngine>,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, SchemaMismatch> {
        assembler.verify(engine.schema())?;
        info!(
            model = %engine.name(),
            schema_version = %engine.schema().version,
            features = assembler.feature_count(),
            "Scoring service initialized"
        );

        Ok(Self {
            client,
            assembler,
            engine,
            metrics,
        })
    }

    /// Validate and score one request.
    pub async fn score(&self, request: &ScoreRequest) -> Result<ScoreOutcome, ScoreError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("score", request_id = %request_id);

        async {
            let transaction = match request.validate() {
                Ok(tx) => tx,
                Err(e) => {
                    self.metrics.record_rejection();
                    warn!(error = %e, amount = ?request.amount, "Rejected score request");
                    return Err(ScoreError::InvalidInput(e));
                }
            };
            self.score_transaction(&transaction).await
        }
        .instrument(span)
        .await
    }

    /// Score an already validated transaction.
    pub async fn score_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<ScoreOutcome, ScoreError> {
        let start = Instant::now();

        let (source, destination) = tokio::join!(
            self.client.get(&transaction.source_id),
            self.client.get(&transaction.destination_id)
        );

        let vector = self
            .assembler
            .build(transaction, &source.features, &destination.features);

        let probability = match self.engine.score(&vector) {
            Ok(p) => p,
            Err(e) => {
                self.metrics.record_inference_failure();
                return Err(ScoreError::Inference(e));
            }
        };

        let elapsed = start.elapsed();
        self.metrics.record_transaction(elapsed, probability);

        if source.origin.is_fallback() || destination.origin.is_fallback() {
            debug!(
                source_origin = %source.origin,
                destination_origin = %destination.origin,
                "Scored with cold-start features"
            );
        }
        info!(
            source_id = %transaction.source_id,
            destination_id = %transaction.destination_id,
            amount = transaction.amount,
            risk_probability = probability,
            processing_time_us = elapsed.as_micros() as u64,
            "Transaction scored"
        );

        Ok(ScoreOutcome {
            probability,
            source_origin: source.origin,
            destination_origin: destination.origin,
            vector,
        })
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            graph_backend_reachable: self.client.ping().await,
            // a service cannot be built without a loaded model
            model_loaded: true,
        }
    }

    pub fn client(&self) -> &FeatureStoreClient {
        &self.client
    }

    pub fn engine(&self) -> &RiskScoringEngine {
        &self.engine
    }

    pub fn assembler(&self) -> FeatureAssembler {
        self.assembler
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }
}
