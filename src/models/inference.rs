//! Risk scoring engine

use std::path::Path;
use tracing::debug;

use super::loader::ModelLoader;
use super::tree::TreeEnsemble;
use crate::error::{InferenceError, ModelLoadError};
use crate::schema::{FeatureVector, ModelSchema};

/// Artifact format behind an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    TreeEnsemble,
    Onnx,
}

#[derive(Debug)]
pub(crate) enum ModelBackend {
    TreeEnsemble(TreeEnsemble),
    #[cfg(feature = "onnx")]
    Onnx(super::onnx::OnnxModel),
}

/// Immutable, loaded classifier mapping feature vectors to probabilities.
///
/// Shared behind an `Arc` by every request. Scores are returned as produced;
/// thresholds and risk bands are a caller concern.
#[derive(Debug)]
pub struct RiskScoringEngine {
    name: String,
    schema: ModelSchema,
    backend: ModelBackend,
}

impl RiskScoringEngine {
    pub(crate) fn new(name: String, schema: ModelSchema, backend: ModelBackend) -> Self {
        Self {
            name,
            schema,
            backend,
        }
    }

    /// Load an artifact with default loader settings.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
        ModelLoader::new().load(path)
    }

    /// Fraud probability for one vector.
    pub fn score(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let probability = match &self.backend {
            ModelBackend::TreeEnsemble(model) => model.predict_proba(features.as_slice()),
            #[cfg(feature = "onnx")]
            ModelBackend::Onnx(model) => model.predict(features)?,
        };

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidOutput(probability));
        }

        debug!(model = %self.name, probability, "Model inference complete");
        Ok(probability)
    }

    /// Score a batch of vectors independently.
    pub fn score_batch(&self, batch: &[FeatureVector]) -> Vec<Result<f64, InferenceError>> {
        batch.iter().map(|f| self.score(f)).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn format(&self) -> ModelFormat {
        match self.backend {
            ModelBackend::TreeEnsemble(_) => ModelFormat::TreeEnsemble,
            #[cfg(feature = "onnx")]
            ModelBackend::Onnx(_) => ModelFormat::Onnx,
        }
    }
}
