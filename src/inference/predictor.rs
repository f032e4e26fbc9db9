//! Prediction results
//!
//! Turns the classifier's output vector into a labelled prediction. The
//! winning class is the arg-max; ties go to the lowest index. No confidence
//! threshold is applied to the label itself, low confidence is only flagged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::labels::{ClassLabel, NUM_CLASSES};
use crate::utils::error::{DiagnosisError, Result};

/// One entry of the ranked class list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub label: ClassLabel,
    pub probability: f32,
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted label (arg-max of the probabilities)
    pub label: ClassLabel,

    /// Predicted class index
    pub class_index: usize,

    /// Probability of the predicted class
    pub confidence: f32,

    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,

    /// Highest-ranked classes, best first
    pub top_k: Vec<RankedClass>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

/// Index of the largest value; the first one wins ties and NaN never wins
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Prediction {
    /// Build a prediction from the model's output vector
    pub fn from_probabilities(
        probabilities: Vec<f32>,
        inference_time: Duration,
        top_k: usize,
    ) -> Result<Self> {
        if probabilities.len() != NUM_CLASSES {
            return Err(DiagnosisError::Inference(format!(
                "model returned {} scores, expected {}",
                probabilities.len(),
                NUM_CLASSES
            )));
        }

        let class_index = argmax(&probabilities).ok_or_else(|| {
            DiagnosisError::Inference("model returned no finite scores".to_string())
        })?;
        let label = ClassLabel::from_index(class_index).ok_or_else(|| {
            DiagnosisError::Inference(format!("class index {} out of range", class_index))
        })?;

        // Stable sort keeps lower indices first among equal scores
        let mut ranked: Vec<(usize, f32)> = probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let top_k = ranked
            .into_iter()
            .take(top_k.max(1))
            .filter_map(|(i, probability)| {
                ClassLabel::from_index(i).map(|label| RankedClass { label, probability })
            })
            .collect();

        Ok(Self {
            label,
            class_index,
            confidence: probabilities[class_index],
            probabilities,
            top_k,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        })
    }

    /// Whether the winning probability falls below `threshold`
    pub fn is_low_confidence(&self, threshold: f32) -> bool {
        self.confidence < threshold
    }

    /// Gap between the winning probability and the runner-up
    pub fn margin(&self) -> f32 {
        let runner_up = self
            .probabilities
            .iter()
            .enumerate()
            .filter(|&(i, p)| i != self.class_index && !p.is_nan())
            .map(|(_, &p)| p)
            .fold(None, |best: Option<f32>, p| Some(best.map_or(p, |b| b.max(p))));
        match runner_up {
            Some(p) => self.confidence - p,
            None => self.confidence,
        }
    }
}
