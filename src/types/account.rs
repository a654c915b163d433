//! Account centrality attributes produced by the graph analytics job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Centrality attributes of one account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountFeatures {
    pub pagerank: f64,
    pub degree: u64,
    pub betweenness: f64,
    pub community: i64,
}

/// Attributes used for accounts the graph has never seen.
pub const COLD_START: AccountFeatures = AccountFeatures {
    pagerank: 0.0,
    degree: 0,
    betweenness: 0.0,
    community: -1,
};

impl AccountFeatures {
    /// Map possibly-missing raw values into attributes.
    ///
    /// Absent fields take the cold-start value. Non-finite or negative
    /// centralities are replaced by zero.
    pub fn from_raw(
        pagerank: Option<f64>,
        degree: Option<i64>,
        betweenness: Option<f64>,
        community: Option<i64>,
    ) -> Self {
        Self {
            pagerank: non_negative(pagerank),
            degree: degree.map(|d| d.max(0) as u64).unwrap_or(COLD_START.degree),
            betweenness: non_negative(betweenness),
            community: community.unwrap_or(COLD_START.community),
        }
    }

    /// Resolve a lookup result, substituting the cold-start attributes for
    /// unknown accounts. Shared by online and offline featurization.
    pub fn resolve(found: Option<AccountFeatures>) -> Self {
        found.unwrap_or(COLD_START)
    }

    pub fn is_cold_start(&self) -> bool {
        *self == COLD_START
    }
}

impl Default for AccountFeatures {
    fn default() -> Self {
        COLD_START
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// An account id with its attributes, as exported from the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    #[serde(flatten)]
    pub features: AccountFeatures,
}

/// Why a lookup fell back to the cold-start attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Timeout,
    NotFound,
    BackendError,
}

/// Where a lookup's attributes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureOrigin {
    CacheHit,
    Fetched,
    Fallback(FallbackReason),
}

impl FeatureOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FeatureOrigin::Fallback(_))
    }

    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FeatureOrigin::CacheHit => "cache_hit",
            FeatureOrigin::Fetched => "fetched",
            FeatureOrigin::Fallback(FallbackReason::Timeout) => "fallback_timeout",
            FeatureOrigin::Fallback(FallbackReason::NotFound) => "fallback_not_found",
            FeatureOrigin::Fallback(FallbackReason::BackendError) => "fallback_backend_error",
        }
    }
}

impl fmt::Display for FeatureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of resolving one account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureLookup {
    pub features: AccountFeatures,
    pub origin: FeatureOrigin,
}

impl FeatureLookup {
    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            features: COLD_START,
            origin: FeatureOrigin::Fallback(reason),
        }
    }
}

/// Cached attributes for one account. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCacheEntry {
    pub account_id: String,
    pub features: AccountFeatures,
    pub fetched_at: DateTime<Utc>,
}
