//! Prediction output formatting and post-processing
//!
//! Handles normalisation of raw class weights into a probability
//! distribution and confidence scoring of the resulting prediction.

use crate::error::ClassifierError;
use crate::models::SeverityLabel;
use serde::{Deserialize, Serialize};

/// Tolerance for a distribution summing to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Default confidence below which a prediction is flagged
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Normalised entropy above which a prediction is considered uncertain
pub const ENTROPY_UNCERTAIN_THRESHOLD: f64 = 0.85;

/// Probability per severity class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ClassProbabilities {
    /// Normalise non-negative class weights, indexed by [`SeverityLabel::index`]
    pub fn from_weights(weights: [f64; 3]) -> Result<Self, ClassifierError> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ClassifierError::InvalidOutput(format!(
                "weights must be finite and non-negative, got {:?}",
                weights
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ClassifierError::InvalidOutput("all class weights are zero".to_string()));
        }
        Ok(Self {
            low: weights[0] / total,
            medium: weights[1] / total,
            high: weights[2] / total,
        })
    }

    /// All mass on one class
    pub fn certain(label: SeverityLabel) -> Self {
        let mut weights = [0.0; 3];
        weights[label.index()] = 1.0;
        Self {
            low: weights[0],
            medium: weights[1],
            high: weights[2],
        }
    }

    pub fn get(&self, label: SeverityLabel) -> f64 {
        match label {
            SeverityLabel::Low => self.low,
            SeverityLabel::Medium => self.medium,
            SeverityLabel::High => self.high,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.low, self.medium, self.high]
    }

    /// Most probable class. Ties go to the more severe label.
    pub fn top(&self) -> (SeverityLabel, f64) {
        SeverityLabel::ALL
            .iter()
            .map(|label| (*label, self.get(*label)))
            .fold((SeverityLabel::Low, f64::NEG_INFINITY), |best, candidate| {
                if candidate.1 >= best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    /// Shannon entropy normalised to [0, 1]
    pub fn entropy(&self) -> f64 {
        let max_entropy = (3.0_f64).ln();
        let h: f64 = self
            .to_array()
            .iter()
            .filter(|p| **p > 1e-15)
            .map(|p| -p * p.ln())
            .sum();
        h / max_entropy
    }

    pub fn is_normalized(&self) -> bool {
        (self.to_array().iter().sum::<f64>() - 1.0).abs() <= PROBABILITY_TOLERANCE
    }
}

/// Where a severity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Rules,
}

/// Final severity prediction with confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityPrediction {
    pub label: SeverityLabel,
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    pub model_version: String,
    pub source: PredictionSource,
    pub generated_at: i64,
}

/// Configuration for output formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub low_confidence_threshold: f64,
    pub entropy_uncertain_threshold: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
            entropy_uncertain_threshold: ENTROPY_UNCERTAIN_THRESHOLD,
        }
    }
}

/// Turns class probabilities into a [`SeverityPrediction`]
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn format(
        &self,
        probabilities: ClassProbabilities,
        model_version: &str,
        source: PredictionSource,
    ) -> SeverityPrediction {
        let (label, confidence) = probabilities.top();
        SeverityPrediction {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            probabilities,
            model_version: model_version.to_string(),
            source,
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn low_confidence_reason(&self, prediction: &SeverityPrediction) -> Option<String> {
        if prediction.probabilities.entropy() > self.config.entropy_uncertain_threshold {
            Some("Class probabilities are close to uniform".to_string())
        } else if prediction.confidence < self.config.low_confidence_threshold {
            Some(format!(
                "Top class confidence {:.0}% is below {:.0}%",
                prediction.confidence * 100.0,
                self.config.low_confidence_threshold * 100.0
            ))
        } else {
            None
        }
    }
}
