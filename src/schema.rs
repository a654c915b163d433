//! Feature schema shared by the online scorer and the offline dataset builder.
//!
//! The order of [`FEATURE_NAMES`] is the column order the model was trained
//! on. Changing it requires a new [`SCHEMA_VERSION`] and a retrained model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version tag embedded in every model artifact trained on this layout.
pub const SCHEMA_VERSION: &str = "graph-centrality-v1";

/// Number of features in a vector.
pub const FEATURE_COUNT: usize = 7;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "src_pagerank",
    "dst_pagerank",
    "src_degree",
    "dst_degree",
    "src_betweenness",
    "dst_betweenness",
];

/// Schema versions this build knows how to assemble.
pub const SUPPORTED_SCHEMA_VERSIONS: [&str; 1] = [SCHEMA_VERSION];

/// Schema a model artifact declares it was trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub version: String,
    pub features: Vec<String>,
}

impl ModelSchema {
    /// Schema matching the layout compiled into this build.
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn is_supported_version(&self) -> bool {
        SUPPORTED_SCHEMA_VERSIONS.contains(&self.version.as_str())
    }
}

/// A fixed-length model input. Always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub(crate) fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value by feature name, `None` for names outside the schema.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    /// Single-precision copy for runtimes that take f32 tensors.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }

    /// Bit patterns of every value; equal iff the vectors are bit-identical.
    pub fn to_bits(&self) -> [u64; FEATURE_COUNT] {
        self.0.map(f64::to_bits)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (name, value)) in FEATURE_NAMES.iter().zip(self.0.iter()).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("]")
    }
}
