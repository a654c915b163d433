//! In-memory graph backend loaded from an exported account feature file

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{GraphBackend, TransferFilter, TransferRecord};
use crate::dataset::{read_account_snapshot, read_ledger, FeatureSource};
use crate::error::BackendError;
use crate::types::{AccountFeatures, AccountRecord, LabeledTransaction};

/// Account attributes exported from the graph, plus an optional ledger for
/// sample reads. Serves both the online client and the offline builder.
#[derive(Debug, Default)]
pub struct SnapshotBackend {
    accounts: Vec<AccountRecord>,
    index: HashMap<String, usize>,
    ledger: Vec<TransferRecord>,
}

impl SnapshotBackend {
    pub fn from_records(records: Vec<AccountRecord>) -> Self {
        let mut backend = Self::default();
        for record in records {
            match backend.index.get(&record.id) {
                // Later rows win, as a re-export would overwrite them.
                Some(&idx) => backend.accounts[idx] = record,
                None => {
                    backend.index.insert(record.id.clone(), backend.accounts.len());
                    backend.accounts.push(record);
                }
            }
        }
        backend
    }

    pub fn with_ledger(mut self, ledger: &[LabeledTransaction]) -> Self {
        self.ledger = ledger.iter().map(TransferRecord::from).collect();
        self
    }

    /// Load an account snapshot CSV and, optionally, a ledger CSV.
    pub fn load(snapshot_path: &Path, ledger_path: Option<&Path>) -> Result<Self> {
        let backend = Self::from_records(read_account_snapshot(snapshot_path)?);
        let backend = match ledger_path {
            Some(path) => backend.with_ledger(&read_ledger(path)?),
            None => backend,
        };

        info!(
            accounts = backend.accounts.len(),
            transfers = backend.ledger.len(),
            path = %snapshot_path.display(),
            "Account feature snapshot loaded"
        );
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl FeatureSource for SnapshotBackend {
    fn lookup(&self, account_id: &str) -> Option<AccountFeatures> {
        self.index
            .get(account_id)
            .map(|&idx| self.accounts[idx].features)
    }
}

#[async_trait]
impl GraphBackend for SnapshotBackend {
    async fn get_attributes(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountFeatures>, BackendError> {
        Ok(self.lookup(account_id))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn sample_accounts(&self, limit: usize) -> Result<Vec<AccountRecord>, BackendError> {
        Ok(self.accounts.iter().take(limit).cloned().collect())
    }

    async fn sample_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, BackendError> {
        Ok(self
            .ledger
            .iter()
            .filter(|t| filter.matches(t.is_fraud))
            .take(limit)
            .cloned()
            .collect())
    }
}
