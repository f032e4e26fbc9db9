//! Inference module: the classifier adapter and its prediction results
//!
//! The model is loaded once at startup into an [`OnnxClassifier`] and shared
//! read-only behind an `Arc<dyn LeafClassifier>` for the life of the process.

pub mod classifier;
pub mod predictor;

// Re-export main types for convenience
pub use classifier::{LeafClassifier, OnnxClassifier};
pub use predictor::{argmax, Prediction, RankedClass};
