//! Model artifact loader

use std::path::Path;
use tracing::info;

use super::inference::{ModelBackend, RiskScoringEngine};
use super::tree::{TreeEnsemble, TreeEnsembleArtifact};
use crate::error::ModelLoadError;
use crate::schema::SUPPORTED_SCHEMA_VERSIONS;

/// Loader for risk model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load an artifact, choosing the format by file extension.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<RiskScoringEngine, ModelLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelLoadError::Missing(path.to_path_buf()));
        }

        info!(path = %path.display(), "Loading risk model");

        let engine = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.load_tree_ensemble(path)?,
            #[cfg(feature = "onnx")]
            Some("onnx") => {
                let (model, schema) = super::onnx::OnnxModel::load(path, self.onnx_threads)?;
                let name = file_stem(path);
                RiskScoringEngine::new(name, schema, ModelBackend::Onnx(model))
            }
            _ => return Err(ModelLoadError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(
            model = %engine.name(),
            format = ?engine.format(),
            schema_version = %engine.schema().version,
            "Model loaded successfully"
        );
        Ok(engine)
    }

    fn load_tree_ensemble(&self, path: &Path) -> Result<RiskScoringEngine, ModelLoadError> {
        let corrupt = |reason: String| ModelLoadError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let artifact: TreeEnsembleArtifact =
            serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

        if !SUPPORTED_SCHEMA_VERSIONS.contains(&artifact.schema.version.as_str()) {
            return Err(ModelLoadError::UnsupportedSchema(artifact.schema.version));
        }

        let ensemble = TreeEnsemble::from_artifact(&artifact).map_err(corrupt)?;
        let name = artifact.name.clone().unwrap_or_else(|| file_stem(path));
        info!(model = %name, trees = ensemble.tree_count(), "Tree ensemble validated");

        Ok(RiskScoringEngine::new(
            name,
            artifact.schema,
            ModelBackend::TreeEnsemble(ensemble),
        ))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_model(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_artifact() {
        let err = ModelLoader::new().load("models/does_not_exist.json").unwrap_err();
        assert!(matches!(err, ModelLoadError::Missing(_)));
    }

    #[test]
    fn test_corrupt_artifact() {
        let file = write_model("{ not json");
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
    }

    #[test]
    fn test_unsupported_schema_version() {
        let file = write_model(
            r#"{"schema": {"version": "graph-centrality-v9", "features": []},
                "objective": "binary:logistic", "base_margin": 0.0,
                "trees": [{"nodes": [{"leaf": 0.0}]}]}"#,
        );
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::UnsupportedSchema(v) if v == "graph-centrality-v9"));
    }

    #[test]
    fn test_structurally_invalid_tree() {
        let file = write_model(
            r#"{"schema": {"version": "graph-centrality-v1", "features": ["amount"]},
                "objective": "binary:logistic", "base_margin": 0.0,
                "trees": [{"nodes": [{"feature": 0, "threshold": 1.0, "yes": 1, "no": 5}, {"leaf": 0.0}]}]}"#,
        );
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
    }

    #[test]
    fn test_unknown_extension() {
        let mut file = tempfile::Builder::new().suffix(".pkl").tempfile().unwrap();
        file.write_all(b"\x80\x04").unwrap();
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_packaged_model_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/aml_model.json");
        let engine = ModelLoader::new().load(path).unwrap();
        assert_eq!(engine.name(), "aml_model");
        assert!(engine.schema().is_supported_version());
    }
}
