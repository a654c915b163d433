//! Graph feature store: account centrality lookups with caching and
//! cold-start fallback.

pub mod client;
pub mod neo4j;
pub mod snapshot;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{BackendKind, GraphConfig};
use crate::error::BackendError;
use crate::types::{AccountFeatures, AccountRecord, LabeledTransaction};

pub use client::FeatureStoreClient;
pub use neo4j::Neo4jBackend;
pub use snapshot::SnapshotBackend;

/// Which transfers a sample read returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFilter {
    All,
    FraudOnly,
    NormalOnly,
}

impl TransferFilter {
    pub fn matches(&self, is_fraud: bool) -> bool {
        match self {
            TransferFilter::All => true,
            TransferFilter::FraudOnly => is_fraud,
            TransferFilter::NormalOnly => !is_fraud,
        }
    }
}

/// A recorded transfer as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub source_id: String,
    pub destination_id: String,
    pub amount: f64,
    pub is_fraud: bool,
}

impl From<&LabeledTransaction> for TransferRecord {
    fn from(labeled: &LabeledTransaction) -> Self {
        Self {
            source_id: labeled.transaction.source_id.clone(),
            destination_id: labeled.transaction.destination_id.clone(),
            amount: labeled.transaction.amount,
            is_fraud: labeled.is_fraud,
        }
    }
}

/// External system of record for account centrality attributes.
///
/// Implementations map backend rows into [`AccountFeatures`] once, at this
/// boundary. `Ok(None)` means the backend confirmed the account is absent.
#[async_trait]
pub trait GraphBackend: Send + Sync + 'static {
    async fn get_attributes(&self, account_id: &str)
        -> Result<Option<AccountFeatures>, BackendError>;

    /// Cheap reachability check with no side effects.
    async fn ping(&self) -> Result<(), BackendError>;

    async fn sample_accounts(&self, limit: usize) -> Result<Vec<AccountRecord>, BackendError>;

    async fn sample_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, BackendError>;
}

/// Build the backend selected by configuration.
pub fn backend_from_config(config: &GraphConfig) -> Result<Arc<dyn GraphBackend>> {
    match config.backend {
        BackendKind::Neo4j => {
            let backend =
                Neo4jBackend::new(config).context("Failed to create Neo4j graph backend")?;
            Ok(Arc::new(backend))
        }
        BackendKind::Snapshot => {
            let backend = SnapshotBackend::load(&config.snapshot_path, config.ledger_path.as_deref())
                .context("Failed to load account feature snapshot")?;
            Ok(Arc::new(backend))
        }
    }
}
