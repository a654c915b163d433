//! ONNX Runtime model backend (`onnx` feature).
//!
//! The artifact must carry `schema_version` in its custom metadata and may
//! carry `feature_names` as a comma-separated list. Export classifiers
//! without a ZipMap so probabilities come out as a `[batch, classes]` tensor.

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::error::{InferenceError, ModelLoadError};
use crate::schema::{FeatureVector, ModelSchema, FEATURE_COUNT, SUPPORTED_SCHEMA_VERSIONS};

/// Loaded ONNX session. Runs need exclusive access to the session.
#[derive(Debug)]
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    pub fn load(path: &Path, threads: usize) -> Result<(Self, ModelSchema), ModelLoadError> {
        let runtime = |e: ort::Error| ModelLoadError::Runtime(e.to_string());

        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .with_intra_threads(threads)
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(|e| ModelLoadError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let schema = {
            let metadata = session.metadata().map_err(runtime)?;
            let version = metadata
                .custom("schema_version")
                .map_err(runtime)?
                .ok_or_else(|| ModelLoadError::UnsupportedSchema("<none>".to_string()))?;
            let features = match metadata.custom("feature_names").map_err(runtime)? {
                Some(names) => names.split(',').map(|n| n.trim().to_string()).collect(),
                None => ModelSchema::current().features,
            };
            ModelSchema { version, features }
        };

        if !SUPPORTED_SCHEMA_VERSIONS.contains(&schema.version.as_str()) {
            return Err(ModelLoadError::UnsupportedSchema(schema.version));
        }

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            threads,
            "ONNX session ready"
        );

        Ok((
            Self {
                session: Mutex::new(session),
                input_name,
                output_name,
            },
            schema,
        ))
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let runtime = |e: ort::Error| InferenceError::Runtime(e.to_string());

        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input = Tensor::from_array((shape, features.to_f32_vec())).map_err(runtime)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(runtime)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            InferenceError::Runtime(format!("missing output {}", self.output_name))
        })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(runtime)?;
        fraud_probability(&shape, data)
    }
}

/// Class-1 probability from a `[classes]`, `[batch, classes]` or `[batch, 1]` tensor.
fn fraud_probability(shape: &ort::tensor::Shape, data: &[f32]) -> Result<f64, InferenceError> {
    let classes = shape.iter().last().copied().unwrap_or(0);
    let value = match classes {
        c if c >= 2 => data.get(1),
        1 => data.first(),
        _ => None,
    };
    value
        .map(|&p| p as f64)
        .ok_or_else(|| InferenceError::Runtime(format!("unexpected output shape {shape:?}")))
}
