//! Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;

use crate::types::InvalidTransaction;

/// Compiled-in feature layout disagrees with the model's declared schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("model schema version {found:?} does not match assembler version {expected:?}")]
    Version { expected: String, found: String },
    #[error("model expects {found} features, assembler produces {expected}")]
    FeatureCount { expected: usize, found: usize },
    #[error("feature {index} is {found:?} in the model but {expected:?} in the assembler")]
    FeatureOrder {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Model artifact could not be turned into a scoring engine.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found at {}", .0.display())]
    Missing(PathBuf),
    #[error("model artifact {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("model artifact declares unsupported schema version {0:?}")]
    UnsupportedSchema(String),
    #[error("unsupported model format for {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// A loaded model failed to produce a usable probability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("model produced an invalid probability {0}")]
    InvalidOutput(f64),
    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Failure talking to the graph backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("graph backend request failed: {0}")]
    Transport(String),
    #[error("graph backend returned status {0}")]
    Status(u16),
    #[error("graph backend query failed: {code}: {message}")]
    Query { code: String, message: String },
    #[error("graph backend returned an unexpected response: {0}")]
    Decode(String),
    #[error("graph backend call timed out")]
    Timeout,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl BackendError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport(_) | BackendError::Timeout => true,
            BackendError::Status(code) => *code >= 500,
            BackendError::Query { .. } | BackendError::Decode(_) => false,
        }
    }
}

/// Request-level failure of the scoring pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid transaction: {0}")]
    InvalidInput(#[from] InvalidTransaction),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Score(ScoreError::InvalidInput(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::InvalidBody(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::Score(ScoreError::Inference(e)) => {
                tracing::error!(error = %e, "Inference error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Risk model failed to score transaction".to_string(),
                )
            }
            ApiError::Backend(e) => {
                tracing::error!(error = %e, "Graph backend error");
                (StatusCode::BAD_GATEWAY, "Graph backend unavailable".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
