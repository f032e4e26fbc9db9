//! Classifier adapter around the pretrained model artifact

use std::path::{Path, PathBuf};
use std::time::Instant;

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::ingest::ImageTensor;
use crate::labels::NUM_CLASSES;
use crate::utils::error::{DiagnosisError, Result};

use super::predictor::Prediction;

/// Anything that can turn a prepared leaf image into a prediction
pub trait LeafClassifier: Send + Sync {
    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction>;

    /// Edge length of the square input the classifier expects
    fn input_size(&self) -> u32;

    /// Short human-readable description for logs and health output
    fn describe(&self) -> String {
        format!("classifier ({}x{} input)", self.input_size(), self.input_size())
    }
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX export of the leaf classifier, run with tract
pub struct OnnxClassifier {
    model: OnnxPlan,
    path: PathBuf,
    input_size: u32,
    top_k: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("path", &self.path)
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load and optimize the model, then verify it with a warm-up run.
    ///
    /// Any failure here is fatal for the process: there is no fallback model.
    pub fn load(path: &Path, input_size: u32, top_k: usize) -> Result<Self> {
        let load_err = |msg: String| DiagnosisError::ModelLoad(path.to_path_buf(), msg);

        if !path.is_file() {
            return Err(load_err("model file not found".to_string()));
        }

        let started = Instant::now();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| load_err(format!("failed to parse model: {}", e)))?
            .with_input_fact(0, f32::fact([1, size, size, 3]).into())
            .map_err(|e| load_err(format!("model rejects a 1x{size}x{size}x3 input: {}", e)))?
            .into_optimized()
            .map_err(|e| load_err(format!("failed to optimize model: {}", e)))?
            .into_runnable()
            .map_err(|e| load_err(format!("failed to build execution plan: {}", e)))?;

        let classifier = Self {
            model,
            path: path.to_path_buf(),
            input_size,
            top_k,
        };

        let scores = classifier
            .run_raw(&ImageTensor::zeros(input_size))
            .map_err(|e| load_err(format!("warm-up inference failed: {}", e)))?;
        if scores.len() != NUM_CLASSES {
            return Err(load_err(format!(
                "model produces {} outputs, expected {}",
                scores.len(),
                NUM_CLASSES
            )));
        }

        info!(
            path = %path.display(),
            input_size,
            load_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Model loaded"
        );
        Ok(classifier)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw output vector for one tensor
    fn run_raw(&self, tensor: &ImageTensor) -> Result<Vec<f32>> {
        let input = Tensor::from_shape(&tensor.shape(), tensor.as_slice())
            .map_err(|e| DiagnosisError::Inference(format!("invalid input tensor: {}", e)))?;

        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .map_err(|e| DiagnosisError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| DiagnosisError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| DiagnosisError::Inference(format!("unexpected output type: {}", e)))?;

        Ok(view.iter().copied().collect())
    }
}

impl LeafClassifier for OnnxClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction> {
        if tensor.size() != self.input_size {
            return Err(DiagnosisError::Inference(format!(
                "tensor is {}x{}, model expects {}x{}",
                tensor.size(),
                tensor.size(),
                self.input_size,
                self.input_size
            )));
        }

        let started = Instant::now();
        let scores = self.run_raw(tensor)?;
        let prediction = Prediction::from_probabilities(scores, started.elapsed(), self.top_k)?;

        debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            inference_ms = prediction.inference_time_ms,
            "Prediction"
        );
        Ok(prediction)
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn describe(&self) -> String {
        format!(
            "ONNX model {} ({}x{} input, {} classes)",
            self.path.display(),
            self.input_size,
            self.input_size,
            NUM_CLASSES
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::labels::ClassLabel;

    // Averages the 300 input values into 10 scores: score j is the mean of
    // every flat index congruent to j modulo 10
    const MEAN10: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mean10.onnx");
    // Same graph with 4 outputs
    const MEAN4: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mean4.onnx");

    fn tensor_with(entries: &[(usize, f32)]) -> ImageTensor {
        let mut data = vec![0.0; 10 * 10 * 3];
        for &(i, v) in entries {
            data[i] = v;
        }
        ImageTensor::from_raw(data, 10).unwrap()
    }

    #[test]
    fn test_ten_output_model_predicts_argmax() {
        let classifier = OnnxClassifier::load(Path::new(MEAN10), 10, 3).unwrap();
        assert_eq!(classifier.input_size(), 10);
        assert!(classifier.describe().contains("mean10.onnx"));

        let prediction = classifier.predict(&tensor_with(&[(7, 255.0), (13, 60.0)])).unwrap();
        assert_eq!(prediction.class_index, 7);
        assert_eq!(prediction.label, ClassLabel::TomatoBacterialSpot);
        assert!((prediction.confidence - 8.5).abs() < 1e-4);
        assert_eq!(prediction.probabilities.len(), NUM_CLASSES);
        assert_eq!(prediction.top_k[1].label, ClassLabel::from_index(3).unwrap());

        let other = classifier.predict(&tensor_with(&[(290, 30.0)])).unwrap();
        assert_eq!(other.label, ClassLabel::AppleScab);
    }

    #[test]
    fn test_wrong_output_count_is_load_error() {
        let err = OnnxClassifier::load(Path::new(MEAN4), 10, 3).unwrap_err();
        match err {
            DiagnosisError::ModelLoad(path, msg) => {
                assert_eq!(path, PathBuf::from(MEAN4));
                assert!(msg.contains("4 outputs"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tensor_size_mismatch_is_inference_error() {
        let classifier = OnnxClassifier::load(Path::new(MEAN10), 10, 3).unwrap();
        let err = classifier.predict(&ImageTensor::zeros(12)).unwrap_err();
        assert!(matches!(err, DiagnosisError::Inference(_)));
    }

    #[test]
    fn test_missing_model_is_load_error() {
        let err = OnnxClassifier::load(Path::new("/nonexistent/model.onnx"), 256, 3).unwrap_err();
        match err {
            DiagnosisError::ModelLoad(path, msg) => {
                assert_eq!(path, PathBuf::from("/nonexistent/model.onnx"));
                assert!(msg.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_model_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        file.write_all(b"this is not a protobuf model").unwrap();

        let err = OnnxClassifier::load(file.path(), 256, 3).unwrap_err();
        assert!(matches!(err, DiagnosisError::ModelLoad(_, _)));
    }
}
