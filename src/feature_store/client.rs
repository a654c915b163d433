use chrono::Utc;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{GraphBackend, TransferFilter, TransferRecord};
use crate::config::{CacheConfig, GraphConfig};
use crate::error::BackendError;
use crate::metrics::PipelineMetrics;
use crate::types::{
    AccountFeatures, AccountRecord, FallbackReason, FeatureCacheEntry, FeatureLookup,
    FeatureOrigin,
};

/// Sample reads never return more than this many records.
pub const MAX_SAMPLE_LIMIT: usize = 1000;

/// Resolves account ids to centrality attributes.
///
/// - **Cache-first**: unexpired entries are served without touching the backend.
/// - **Per-key coalescing**: concurrent misses for one account share a single
///   backend fetch through moka's `or_try_insert_with`; other accounts are
///   not blocked.
/// - **Bulkhead**: backend calls hold a permit from a dedicated semaphore, so a
///   slow graph database cannot absorb unbounded request capacity.
/// - **Bounded**: permit wait, the call and its retries share one timeout.
/// - **Total**: timeouts, errors and unknown accounts resolve to the
///   cold-start attributes. [`FeatureStoreClient::get`] never fails.
///
/// Fallbacks are not cached, so the next lookup tries the backend again.
pub struct FeatureStoreClient {
    backend: Arc<dyn GraphBackend>,
    cache: Cache<String, FeatureCacheEntry>,
    bulkhead: Arc<Semaphore>,
    timeout: Duration,
    retries: u32,
    metrics: Arc<PipelineMetrics>,
}

impl FeatureStoreClient {
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        graph: &GraphConfig,
        cache: &CacheConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let cache = Cache::builder()
            .time_to_live(cache.ttl())
            .max_capacity(cache.max_entries)
            .build();

        Self {
            backend,
            cache,
            bulkhead: Arc::new(Semaphore::new(graph.max_concurrent_fetches.max(1))),
            timeout: graph.timeout(),
            retries: graph.fetch_retries,
            metrics,
        }
    }

    /// Resolve one account's attributes.
    pub async fn get(&self, account_id: &str) -> FeatureLookup {
        let lookup = self.lookup(account_id).await;
        self.metrics.record_lookup(lookup.origin);
        debug!(account_id = %account_id, origin = %lookup.origin, "Account features resolved");
        lookup
    }

    async fn lookup(&self, account_id: &str) -> FeatureLookup {
        if let Some(entry) = self.cache.get(account_id).await {
            return FeatureLookup {
                features: entry.features,
                origin: FeatureOrigin::CacheHit,
            };
        }

        match self
            .cache
            .entry_by_ref(account_id)
            .or_try_insert_with(self.fetch(account_id))
            .await
        {
            // A non-fresh entry was inserted by a concurrent lookup we joined.
            Ok(entry) => {
                let origin = if entry.is_fresh() {
                    FeatureOrigin::Fetched
                } else {
                    FeatureOrigin::CacheHit
                };
                FeatureLookup {
                    features: entry.into_value().features,
                    origin,
                }
            }
            Err(reason) => FeatureLookup::fallback(*reason),
        }
    }

    async fn fetch(&self, account_id: &str) -> Result<FeatureCacheEntry, FallbackReason> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.fetch_with_retries(account_id)).await;
        self.metrics.record_fetch_time(start.elapsed());

        match result {
            Ok(Ok(Some(features))) => Ok(FeatureCacheEntry {
                account_id: account_id.to_string(),
                features,
                fetched_at: Utc::now(),
            }),
            Ok(Ok(None)) => Err(FallbackReason::NotFound),
            Ok(Err(BackendError::Timeout)) | Err(_) => {
                warn!(
                    account_id = %account_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Graph feature fetch timed out, using cold-start features"
                );
                Err(FallbackReason::Timeout)
            }
            Ok(Err(e)) => {
                warn!(
                    account_id = %account_id,
                    error = %e,
                    "Graph feature fetch failed, using cold-start features"
                );
                Err(FallbackReason::BackendError)
            }
        }
    }

    async fn fetch_with_retries(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountFeatures>, BackendError> {
        let _permit = self
            .bulkhead
            .acquire()
            .await
            .map_err(|_| BackendError::Transport("bulkhead closed".to_string()))?;

        let mut attempt = 0;
        loop {
            match self.backend.get_attributes(account_id).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    debug!(account_id = %account_id, attempt, error = %e, "Retrying graph feature fetch");
                }
                result => return result,
            }
        }
    }

    /// Whether the backend answered within the fetch timeout.
    /// Holds a bulkhead permit like any other backend call.
    pub async fn ping(&self) -> bool {
        self.bounded(self.backend.ping()).await.is_ok()
    }

    /// Up to `limit` accounts from the backend, in no particular order.
    pub async fn sample_accounts(&self, limit: usize) -> Result<Vec<AccountRecord>, BackendError> {
        let limit = limit.min(MAX_SAMPLE_LIMIT);
        self.bounded(self.backend.sample_accounts(limit)).await
    }

    /// Up to `limit` transfers matching `filter`, in no particular order.
    pub async fn sample_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, BackendError> {
        let limit = limit.min(MAX_SAMPLE_LIMIT);
        self.bounded(self.backend.sample_transfers(filter, limit)).await
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        let guarded = async {
            let _permit = self
                .bulkhead
                .acquire()
                .await
                .map_err(|_| BackendError::Transport("bulkhead closed".to_string()))?;
            call.await
        };
        tokio::time::timeout(self.timeout, guarded)
            .await
            .map_err(|_| BackendError::Timeout)?
    }

    /// Number of cached accounts. Approximate while writes are pending.
    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}
