//! Fixtures shared by unit and integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::error::BackendError;
use crate::feature_store::{GraphBackend, TransferFilter, TransferRecord};
use crate::types::{AccountFeatures, AccountRecord, LabeledTransaction, Transaction};

/// Account attributes with a fixed community id.
pub fn account(pagerank: f64, degree: u64, betweenness: f64) -> AccountFeatures {
    AccountFeatures {
        pagerank,
        degree,
        betweenness,
        community: 4,
    }
}

pub fn labeled(source: &str, destination: &str, amount: f64, is_fraud: bool) -> LabeledTransaction {
    LabeledTransaction {
        transaction: Transaction::unchecked(source, destination, amount),
        is_fraud,
    }
}

/// In-memory graph backend that counts calls and can be made slow or failing.
#[derive(Default)]
pub struct StubBackend {
    accounts: RwLock<HashMap<String, AccountFeatures>>,
    transfers: RwLock<Vec<TransferRecord>>,
    delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, account_id: &str, features: AccountFeatures) {
        self.accounts
            .write()
            .unwrap()
            .insert(account_id.to_string(), features);
    }

    pub fn push_transfer(&self, transfer: TransferRecord) {
        self.transfers.write().unwrap().push(transfer);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Backend calls made so far, including pings and samples.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of backend calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // decremented on drop, including cancellation
        let _guard = InFlight(&self.in_flight);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("stub backend unavailable".to_string()));
        }
        Ok(())
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphBackend for StubBackend {
    async fn get_attributes(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountFeatures>, BackendError> {
        self.enter().await?;
        Ok(self.accounts.read().unwrap().get(account_id).copied())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.enter().await
    }

    async fn sample_accounts(&self, limit: usize) -> Result<Vec<AccountRecord>, BackendError> {
        self.enter().await?;
        let mut records: Vec<AccountRecord> = self
            .accounts
            .read()
            .unwrap()
            .iter()
            .map(|(id, features)| AccountRecord {
                id: id.clone(),
                features: *features,
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records.truncate(limit);
        Ok(records)
    }

    async fn sample_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, BackendError> {
        self.enter().await?;
        Ok(self
            .transfers
            .read()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t.is_fraud))
            .take(limit)
            .cloned()
            .collect())
    }
}
