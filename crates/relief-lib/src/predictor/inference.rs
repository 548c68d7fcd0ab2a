//! Severity classifier wrapper and ONNX inference using tract
//!
//! `SeverityClassifier` is the stable entry point: it holds whichever
//! [`SeverityModel`] was loaded, counts inferences and warns on slow ones.
//! `OnnxSeverityModel` runs classifiers exported from the offline trainer.

use super::output::ClassProbabilities;
use super::SeverityModel;
use crate::error::ClassifierError;
use crate::models::{FeatureVector, SeverityLabel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Inference latency above which a warning is logged
pub const SLOW_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Thread-safe wrapper around a fitted severity model
pub struct SeverityClassifier {
    model: RwLock<Option<Box<dyn SeverityModel>>>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl SeverityClassifier {
    /// Create a classifier with no model; predictions fail until one is loaded
    pub fn new_untrained() -> Self {
        Self {
            model: RwLock::new(None),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn with_model(model: Box<dyn SeverityModel>) -> Self {
        let classifier = Self::new_untrained();
        if let Ok(mut slot) = classifier.model.write() {
            *slot = Some(model);
        }
        classifier
    }

    /// Install or replace the model
    pub fn load_model(&self, model: Box<dyn SeverityModel>) -> Result<(), ClassifierError> {
        let version = model.model_version().to_string();
        let mut slot = self
            .model
            .write()
            .map_err(|e| ClassifierError::Load(format!("Lock poisoned: {}", e)))?;
        *slot = Some(model);
        info!(version = %version, "Severity model loaded");
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.model.read().map(|m| m.is_some()).unwrap_or(false)
    }

    pub fn model_version(&self) -> Option<String> {
        self.model
            .read()
            .ok()
            .and_then(|m| m.as_ref().map(|model| model.model_version().to_string()))
    }

    pub fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
        let start = Instant::now();

        let guard = self
            .model
            .read()
            .map_err(|e| ClassifierError::Inference(format!("Lock poisoned: {}", e)))?;
        let model = guard.as_ref().ok_or(ClassifierError::Untrained)?;

        if features.len() != model.num_features() {
            return Err(ClassifierError::Dimension {
                expected: model.num_features(),
                actual: features.len(),
            });
        }

        let probabilities = model.predict_proba(features)?;
        if !probabilities.is_normalized() {
            return Err(ClassifierError::InvalidOutput(format!(
                "probabilities sum to {}",
                probabilities.to_array().iter().sum::<f64>()
            )));
        }

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", SLOW_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(probabilities)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<SeverityLabel, ClassifierError> {
        self.predict_proba(features).map(|p| p.top().0)
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new_untrained()
    }
}

/// Inference statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// ONNX classifier executed with tract
pub struct OnnxSeverityModel {
    plan: TractModel,
    num_features: usize,
    /// Severity of each output column
    class_order: Vec<SeverityLabel>,
    version: String,
}

impl OnnxSeverityModel {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(
        model_bytes: &[u8],
        num_features: usize,
        class_order: Vec<SeverityLabel>,
        version: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        if class_order.len() != SeverityLabel::ALL.len()
            || SeverityLabel::ALL.iter().any(|l| !class_order.contains(l))
        {
            return Err(ClassifierError::Load(format!(
                "class order {:?} must name each severity exactly once",
                class_order
            )));
        }
        let plan = Self::load_plan(model_bytes, num_features)?;
        Ok(Self {
            plan,
            num_features,
            class_order,
            version: version.into(),
        })
    }

    fn load_plan(model_bytes: &[u8], num_features: usize) -> Result<TractModel, ClassifierError> {
        let load = |stage: &str, e: TractError| ClassifierError::Load(format!("{}: {}", stage, e));
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| load("Failed to parse ONNX model", e))?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .map_err(|e| load("Failed to set input shape", e))?
            .into_optimized()
            .map_err(|e| load("Failed to optimize model", e))?
            .into_runnable()
            .map_err(|e| load("Failed to create runnable model", e))
    }

    fn features_to_tensor(&self, features: &FeatureVector) -> Result<Tensor, ClassifierError> {
        tract_ndarray::Array2::from_shape_vec((1, self.num_features), features.as_slice().to_vec())
            .map(Into::into)
            .map_err(|e| ClassifierError::Inference(e.to_string()))
    }

    /// Probability output is the first f32 tensor with one value per class
    fn outputs_to_probabilities(&self, outputs: &[TValue]) -> Result<ClassProbabilities, ClassifierError> {
        let values: Vec<f32> = outputs
            .iter()
            .filter_map(|t| t.to_array_view::<f32>().ok())
            .map(|view| view.iter().copied().collect::<Vec<f32>>())
            .find(|v| v.len() == self.class_order.len())
            .ok_or_else(|| {
                ClassifierError::InvalidOutput(format!(
                    "no output with {} class probabilities",
                    self.class_order.len()
                ))
            })?;

        let mut weights = [0.0; 3];
        for (label, value) in self.class_order.iter().zip(&values) {
            weights[label.index()] = f64::from(*value);
        }
        ClassProbabilities::from_weights(weights)
    }
}

impl SeverityModel for OnnxSeverityModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
        let input = self.features_to_tensor(features)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        self.outputs_to_probabilities(&outputs)
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}
