use std::sync::Arc;
use std::time::Duration;

use aml_risk_scorer::config::{CacheConfig, GraphConfig};
use aml_risk_scorer::error::BackendError;
use aml_risk_scorer::feature_store::{FeatureStoreClient, GraphBackend, Neo4jBackend, TransferFilter};
use aml_risk_scorer::metrics::PipelineMetrics;
use aml_risk_scorer::types::{AccountFeatures, FallbackReason, FeatureOrigin, COLD_START};
use httpmock::prelude::*;
use serde_json::json;

const COMMIT_PATH: &str = "/db/neo4j/tx/commit";

fn graph_config(server: &MockServer, timeout_ms: u64) -> GraphConfig {
    GraphConfig {
        uri: server.base_url(),
        timeout_ms,
        fetch_retries: 0,
        ..GraphConfig::default()
    }
}

fn rows(columns: &[&str], rows: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "results": [{
            "columns": columns,
            "data": rows.into_iter().map(|row| json!({ "row": row })).collect::<Vec<_>>()
        }],
        "errors": []
    })
}

#[tokio::test]
async fn test_get_attributes_maps_row() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(COMMIT_PATH)
                .header_exists("authorization")
                .body_contains("{id: $id}")
                .body_contains(r#""id":"C1000000001""#);
            then.status(200).json_body(rows(
                &["pagerank", "degree", "betweenness", "community"],
                vec![json!([0.15, 4, 0.01, 1])],
            ));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let features = backend.get_attributes("C1000000001").await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        features,
        Some(AccountFeatures {
            pagerank: 0.15,
            degree: 4,
            betweenness: 0.01,
            community: 1,
        })
    );
}

#[tokio::test]
async fn test_null_properties_take_defaults() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH).body_contains("{id: $id}");
            then.status(200).json_body(rows(
                &["pagerank", "degree", "betweenness", "community"],
                vec![json!([null, 3.0, null, null])],
            ));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let features = backend.get_attributes("C1").await.unwrap().unwrap();

    assert_eq!(features.pagerank, 0.0);
    assert_eq!(features.degree, 3);
    assert_eq!(features.betweenness, 0.0);
    assert_eq!(features.community, COLD_START.community);
}

#[tokio::test]
async fn test_missing_account_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH);
            then.status(200).json_body(rows(
                &["pagerank", "degree", "betweenness", "community"],
                vec![],
            ));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    assert_eq!(backend.get_attributes("ghost").await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH);
            then.status(500).body("internal error");
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let err = backend.get_attributes("C1").await.unwrap_err();
    assert!(matches!(err, BackendError::Status(500)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_query_error_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH);
            then.status(200).json_body(json!({
                "results": [],
                "errors": [{
                    "code": "Neo.ClientError.Security.Unauthorized",
                    "message": "The client is unauthorized due to authentication failure."
                }]
            }));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let err = backend.ping().await.unwrap_err();
    assert!(
        matches!(err, BackendError::Query { ref code, .. } if code == "Neo.ClientError.Security.Unauthorized")
    );
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH).body_contains("RETURN 1 AS ok");
            then.status(200).json_body(rows(&["ok"], vec![json!([1])]));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    assert!(backend.ping().await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sample_transfers_passes_filter() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(COMMIT_PATH)
                .body_contains("TRANSFER")
                .body_contains(r#""is_fraud":1"#)
                .body_contains(r#""limit":2"#);
            then.status(200).json_body(rows(
                &["source_id", "destination_id", "amount", "is_fraud"],
                vec![
                    json!(["C3000000001", "C4000000001", 181000.0, 1]),
                    json!(["C3000000002", "C4000000002", 215310.3, true]),
                ],
            ));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let transfers = backend
        .sample_transfers(TransferFilter::FraudOnly, 2)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(transfers.len(), 2);
    assert!(transfers.iter().all(|t| t.is_fraud));
    assert_eq!(transfers[0].source_id, "C3000000001");
}

#[tokio::test]
async fn test_export_skips_rows_without_id() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH);
            then.status(200).json_body(rows(
                &["id", "pagerank", "degree", "betweenness", "community"],
                vec![
                    json!(["C1000000001", 0.15, 4, 0.01, 1]),
                    json!([null, 0.2, 1, 0.0, 2]),
                ],
            ));
        })
        .await;

    let backend = Neo4jBackend::new(&graph_config(&server, 1000)).unwrap();
    let records = backend.export_accounts().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "C1000000001");
}

#[tokio::test]
async fn test_slow_database_falls_back_to_cold_start() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(COMMIT_PATH);
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(rows(
                    &["pagerank", "degree", "betweenness", "community"],
                    vec![json!([0.15, 4, 0.01, 1])],
                ));
        })
        .await;

    let graph = graph_config(&server, 50);
    let backend = Arc::new(Neo4jBackend::new(&graph).unwrap());
    let client = FeatureStoreClient::new(
        backend,
        &graph,
        &CacheConfig::default(),
        Arc::new(PipelineMetrics::new()),
    );

    let lookup = client.get("C1000000001").await;
    assert_eq!(lookup.features, COLD_START);
    assert_eq!(lookup.origin, FeatureOrigin::Fallback(FallbackReason::Timeout));
}
