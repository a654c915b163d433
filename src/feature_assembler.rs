//! Feature assembly for risk model inference and training data.
//!
//! Both the online scorer and the offline dataset builder go through
//! [`FeatureAssembler::build`], so a vector built at serving time is
//! bit-identical to the one the model saw during training.

use crate::error::SchemaMismatch;
use crate::schema::{FeatureVector, ModelSchema, FEATURE_COUNT, FEATURE_NAMES, SCHEMA_VERSION};
use crate::types::{AccountFeatures, Transaction};

/// Combines a transfer and its two accounts' attributes into model input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature vector for a transfer.
    ///
    /// Order matches [`FEATURE_NAMES`]. Community ids are carried by the
    /// attributes but are not model inputs.
    pub fn build(
        &self,
        tx: &Transaction,
        src: &AccountFeatures,
        dst: &AccountFeatures,
    ) -> FeatureVector {
        FeatureVector::from_values([
            finite_or_zero(tx.amount),
            src.pagerank,
            dst.pagerank,
            src.degree as f64,
            dst.degree as f64,
            src.betweenness,
            dst.betweenness,
        ])
    }

    /// Check that a model was trained on the layout this build assembles.
    ///
    /// Called once at startup.
    pub fn verify(&self, model: &ModelSchema) -> Result<(), SchemaMismatch> {
        if model.version != SCHEMA_VERSION {
            return Err(SchemaMismatch::Version {
                expected: SCHEMA_VERSION.to_string(),
                found: model.version.clone(),
            });
        }
        if model.features.len() != FEATURE_COUNT {
            return Err(SchemaMismatch::FeatureCount {
                expected: FEATURE_COUNT,
                found: model.features.len(),
            });
        }
        for (index, (expected, found)) in FEATURE_NAMES.iter().zip(&model.features).enumerate() {
            if expected != found {
                return Err(SchemaMismatch::FeatureOrder {
                    index,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

// Ledger rows are not validated like requests; keep the vector finite.
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
