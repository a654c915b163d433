//! Risk model loading and inference

pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod tree;

pub use inference::{ModelFormat, RiskScoringEngine};
pub use loader::ModelLoader;
pub use tree::TreeEnsemble;
