use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aml_risk_scorer::api::{router, ScoreResponse};
use aml_risk_scorer::config::{CacheConfig, GraphConfig};
use aml_risk_scorer::feature_store::{FeatureStoreClient, GraphBackend, SnapshotBackend};
use aml_risk_scorer::metrics::PipelineMetrics;
use aml_risk_scorer::test_utils::StubBackend;
use aml_risk_scorer::{FeatureAssembler, RiskScoringEngine, ScoringService};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn app_with(backend: Arc<dyn GraphBackend>) -> Router {
    let metrics = Arc::new(PipelineMetrics::new());
    let client = FeatureStoreClient::new(
        backend,
        &GraphConfig {
            timeout_ms: 200,
            fetch_retries: 0,
            ..GraphConfig::default()
        },
        &CacheConfig::default(),
        metrics.clone(),
    );
    let engine = RiskScoringEngine::load(fixture("models/aml_model.json")).unwrap();
    let service = ScoringService::new(
        Arc::new(client),
        FeatureAssembler::new(),
        Arc::new(engine),
        metrics,
    )
    .unwrap();
    router(Arc::new(service), Duration::from_secs(2))
}

fn snapshot_app() -> Router {
    let backend = SnapshotBackend::load(
        &fixture("data/account_features.csv"),
        Some(fixture("data/sample_transactions.csv").as_path()),
    )
    .unwrap();
    app_with(Arc::new(backend))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_score_cold_start_accounts() {
    let response = snapshot_app()
        .oneshot(post_json(
            "/score",
            json!({
                "amount": 5000.0,
                "source_account_id": "C1234567890",
                "destination_account_id": "C9876543210"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ScoreResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert!((body.risk_probability - 0.87).abs() <= 0.01);
}

#[tokio::test]
async fn test_score_accepts_ledger_field_names() {
    let response = snapshot_app()
        .oneshot(post_json(
            "/score",
            json!({"amount": 181000.0, "nameOrig": "C3000000001", "nameDest": "C4000000001"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["risk_probability"].as_f64().unwrap() > 0.8);
}

#[tokio::test]
async fn test_zero_amount_is_bad_request() {
    let response = snapshot_app()
        .oneshot(post_json(
            "/score",
            json!({"amount": 0.0, "source_account_id": "C1", "destination_account_id": "C2"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn test_missing_account_id_is_bad_request() {
    let response = snapshot_app()
        .oneshot(post_json("/score", json!({"amount": 10.0, "source_account_id": "C1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_amount_is_counted_rejection() {
    let app = snapshot_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/score",
            json!({"source_account_id": "C1", "destination_account_id": "C2"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("amount"));

    let metrics = json_body(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(metrics["requests_rejected"], 1);
    assert_eq!(metrics["transactions_scored"], 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = snapshot_app();

    for body in [
        Body::from("{not json"),
        Body::from(r#"{"amount": "lots", "source_account_id": "C1", "destination_account_id": "C2"}"#),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/score")
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], 400);
        assert!(body["error"].is_string());
    }

    let metrics = json_body(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(metrics["requests_rejected"], 2);
}

#[tokio::test]
async fn test_health_ok() {
    let response = snapshot_app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["graph_backend_reachable"], true);
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_health_unavailable_when_backend_down() {
    let backend = Arc::new(StubBackend::new());
    backend.set_failing(true);
    let response = app_with(backend).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["graph_backend_reachable"], false);
}

#[tokio::test]
async fn test_sample_accounts_respects_limit() {
    let response = snapshot_app()
        .oneshot(get("/samples/accounts?limit=3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let accounts = body.as_array().unwrap();
    assert_eq!(accounts.len(), 3);
    assert!(accounts[0]["id"].is_string());
    assert!(accounts[0]["pagerank"].is_number());
}

#[tokio::test]
async fn test_sample_transactions_by_label() {
    let app = snapshot_app();

    let fraud = json_body(
        app.clone()
            .oneshot(get("/samples/transactions/fraud"))
            .await
            .unwrap(),
    )
    .await;
    let fraud = fraud.as_array().unwrap();
    assert_eq!(fraud.len(), 3);
    assert!(fraud.iter().all(|t| t["is_fraud"] == true));

    let normal = json_body(
        app.clone()
            .oneshot(get("/samples/transactions/normal?limit=2"))
            .await
            .unwrap(),
    )
    .await;
    let normal = normal.as_array().unwrap();
    assert_eq!(normal.len(), 2);
    assert!(normal.iter().all(|t| t["is_fraud"] == false));

    let all = json_body(app.oneshot(get("/samples/transactions")).await.unwrap()).await;
    assert_eq!(all.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_sample_backend_failure_is_bad_gateway() {
    let backend = Arc::new(StubBackend::new());
    backend.set_failing(true);
    let response = app_with(backend)
        .oneshot(get("/samples/accounts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_metrics_reflect_requests() {
    let app = snapshot_app();

    app.clone()
        .oneshot(post_json(
            "/score",
            json!({"amount": 250.5, "source_account_id": "C1000000001", "destination_account_id": "M2000000001"}),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/score",
            json!({"amount": -1.0, "source_account_id": "C1", "destination_account_id": "C2"}),
        ))
        .await
        .unwrap();

    let body = json_body(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(body["transactions_scored"], 1);
    assert_eq!(body["requests_rejected"], 1);
    assert_eq!(body["lookups_by_origin"]["fetched"], 2);
}
