//! Performance metrics and statistics tracking for the risk scorer.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

use crate::types::FeatureOrigin;

/// Metrics collector for the scoring pipeline
pub struct PipelineMetrics {
    /// Requests that produced a probability
    pub transactions_scored: AtomicU64,
    /// Requests rejected at validation
    pub requests_rejected: AtomicU64,
    /// Requests whose model call failed
    pub inference_failures: AtomicU64,
    /// Account lookups by origin label
    lookups_by_origin: RwLock<HashMap<&'static str, u64>>,
    /// End-to-end scoring times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Backend fetch times (in microseconds)
    fetch_times: RwLock<Vec<u64>>,
    /// Risk probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            lookups_by_origin: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            fetch_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_transaction(&self, processing_time: Duration, probability: f64) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        push_bounded(&self.processing_times, processing_time, 10_000);

        let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record where an account lookup's attributes came from
    pub fn record_lookup(&self, origin: FeatureOrigin) {
        if let Ok(mut by_origin) = self.lookups_by_origin.write() {
            *by_origin.entry(origin.label()).or_insert(0) += 1;
        }
    }

    /// Record one backend fetch, successful or not
    pub fn record_fetch_time(&self, duration: Duration) {
        push_bounded(&self.fetch_times, duration, 10_000);
    }

    pub fn get_processing_stats(&self) -> LatencyStats {
        latency_stats(&self.processing_times)
    }

    pub fn get_fetch_stats(&self) -> LatencyStats {
        latency_stats(&self.fetch_times)
    }

    pub fn get_lookups_by_origin(&self) -> HashMap<&'static str, u64> {
        self.lookups_by_origin
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Lookups that degraded to cold-start attributes
    pub fn fallback_count(&self) -> u64 {
        self.get_lookups_by_origin()
            .iter()
            .filter(|(label, _)| label.starts_with("fallback"))
            .map(|(_, count)| count)
            .sum()
    }

    /// Scored transactions per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transactions_scored: self.transactions_scored.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            feature_fallbacks: self.fallback_count(),
            lookups_by_origin: self
                .get_lookups_by_origin()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            throughput_per_sec: self.get_throughput(),
            processing: self.get_processing_stats(),
            backend_fetch: self.get_fetch_stats(),
            score_distribution: self.get_score_distribution(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let lookups: u64 = snapshot.lookups_by_origin.values().sum();
        let fallback_rate = if lookups > 0 {
            (snapshot.feature_fallbacks as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              AML RISK SCORER - METRICS SUMMARY               ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Scored: {:>8}  │  Throughput: {:>6.1} tx/s    ║",
            snapshot.transactions_scored, snapshot.throughput_per_sec
        );
        info!(
            "║ Rejected: {:>8}  │  Inference Failures: {:>8}           ║",
            snapshot.requests_rejected, snapshot.inference_failures
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Scoring Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}  ║",
            snapshot.processing.mean_us,
            snapshot.processing.p50_us,
            snapshot.processing.p95_us,
            snapshot.processing.p99_us
        );
        info!(
            "║ Backend Fetch (μs): mean={:>5} p50={:>5} p99={:>5} max={:>5} ║",
            snapshot.backend_fetch.mean_us,
            snapshot.backend_fetch.p50_us,
            snapshot.backend_fetch.p99_us,
            snapshot.backend_fetch.max_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Feature Lookups: {:>8}  │  Cold-start Fallbacks: {:>5.1}%    ║",
            lookups, fallback_rate
        );
        let mut origins: Vec<_> = snapshot.lookups_by_origin.iter().collect();
        origins.sort();
        for (origin, count) in origins {
            info!("║   {:24}: {:>8}", origin, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Risk Probability Distribution:                               ║");
        let total: u64 = snapshot.score_distribution.iter().sum();
        for (i, &count) in snapshot.score_distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(samples: &RwLock<Vec<u64>>, duration: Duration, cap: usize) {
    if let Ok(mut times) = samples.write() {
        times.push(duration.as_micros() as u64);
        if times.len() > cap {
            times.drain(0..cap / 2);
        }
    }
}

fn latency_stats(samples: &RwLock<Vec<u64>>) -> LatencyStats {
    let mut sorted = match samples.read() {
        Ok(times) if !times.is_empty() => times.clone(),
        _ => return LatencyStats::default(),
    };
    sorted.sort_unstable();

    let count = sorted.len();
    let sum: u64 = sorted.iter().sum();
    LatencyStats {
        count: count as u64,
        mean_us: sum / count as u64,
        p50_us: sorted[count / 2],
        p95_us: sorted[(count as f64 * 0.95) as usize],
        p99_us: sorted[(count as f64 * 0.99) as usize],
        max_us: sorted[count - 1],
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub transactions_scored: u64,
    pub requests_rejected: u64,
    pub inference_failures: u64,
    pub feature_fallbacks: u64,
    pub lookups_by_origin: HashMap<String, u64>,
    pub throughput_per_sec: f64,
    pub processing: LatencyStats,
    pub backend_fetch: LatencyStats,
    pub score_distribution: [u64; 10],
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FallbackReason;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_transaction(Duration::from_micros(100), 0.5);
        metrics.record_transaction(Duration::from_micros(200), 1.0);
        metrics.record_rejection();

        assert_eq!(metrics.transactions_scored.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 150);
        assert_eq!(stats.max_us, 200);
    }

    #[test]
    fn test_lookup_origins_and_fallbacks() {
        let metrics = PipelineMetrics::new();
        metrics.record_lookup(FeatureOrigin::CacheHit);
        metrics.record_lookup(FeatureOrigin::Fetched);
        metrics.record_lookup(FeatureOrigin::Fallback(FallbackReason::Timeout));
        metrics.record_lookup(FeatureOrigin::Fallback(FallbackReason::NotFound));
        metrics.record_lookup(FeatureOrigin::Fallback(FallbackReason::NotFound));

        let by_origin = metrics.get_lookups_by_origin();
        assert_eq!(by_origin.get("cache_hit"), Some(&1));
        assert_eq!(by_origin.get("fallback_not_found"), Some(&2));
        assert_eq!(metrics.fallback_count(), 3);
        assert_eq!(metrics.snapshot().feature_fallbacks, 3);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_fetch_stats().count, 0);
        metrics.print_summary();
    }
}
