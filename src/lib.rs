//! AML Risk Scorer Library
//!
//! Real-time anti-money-laundering risk scoring that enriches each transfer
//! with graph-centrality attributes of both accounts and feeds them to a
//! pre-trained classifier. The same feature assembly is used offline to
//! build training data, so the model sees identical vectors in both places.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_assembler;
pub mod feature_store;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod schema;
pub mod telemetry;
pub mod test_utils;
pub mod types;

pub use config::AppConfig;
pub use feature_assembler::FeatureAssembler;
pub use feature_store::FeatureStoreClient;
pub use models::RiskScoringEngine;
pub use orchestrator::{ScoreOutcome, ScoringService};
pub use schema::{FeatureVector, ModelSchema};
pub use types::{ScoreRequest, Transaction};
