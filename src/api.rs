//! HTTP surface of the risk scorer.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::feature_store::{TransferFilter, TransferRecord};
use crate::metrics::MetricsSnapshot;
use crate::orchestrator::{HealthReport, ScoringService};
use crate::types::{AccountRecord, ScoreRequest};

const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub risk_probability: f64,
}

#[derive(Debug, Deserialize)]
pub struct SampleParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SAMPLE_LIMIT
}

pub fn router(service: Arc<ScoringService>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/score", post(score))
        .route("/health", get(health))
        .route("/samples/accounts", get(sample_accounts))
        .route("/samples/transactions", get(sample_transactions))
        .route("/samples/transactions/fraud", get(sample_fraud_transactions))
        .route("/samples/transactions/normal", get(sample_normal_transactions))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(service)
}

async fn score(
    State(service): State<Arc<ScoringService>>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        service.metrics().record_rejection();
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed score request");
        ApiError::InvalidBody(rejection.body_text())
    })?;
    let outcome = service.score(&request).await?;
    Ok(Json(ScoreResponse {
        risk_probability: outcome.probability,
    }))
}

async fn health(State(service): State<Arc<ScoringService>>) -> impl IntoResponse {
    let report: HealthReport = service.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn sample_accounts(
    State(service): State<Arc<ScoringService>>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<AccountRecord>>, ApiError> {
    Ok(Json(service.client().sample_accounts(params.limit).await?))
}

async fn sample_transactions(
    State(service): State<Arc<ScoringService>>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<TransferRecord>>, ApiError> {
    transfers(&service, TransferFilter::All, params.limit).await
}

async fn sample_fraud_transactions(
    State(service): State<Arc<ScoringService>>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<TransferRecord>>, ApiError> {
    transfers(&service, TransferFilter::FraudOnly, params.limit).await
}

async fn sample_normal_transactions(
    State(service): State<Arc<ScoringService>>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<TransferRecord>>, ApiError> {
    transfers(&service, TransferFilter::NormalOnly, params.limit).await
}

async fn transfers(
    service: &ScoringService,
    filter: TransferFilter,
    limit: usize,
) -> Result<Json<Vec<TransferRecord>>, ApiError> {
    Ok(Json(service.client().sample_transfers(filter, limit).await?))
}

async fn metrics(State(service): State<Arc<ScoringService>>) -> Json<MetricsSnapshot> {
    Json(service.metrics().snapshot())
}
