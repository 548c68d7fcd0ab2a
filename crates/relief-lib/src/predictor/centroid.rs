//! Nearest-centroid reference model
//!
//! A small serializable classifier fitted on encoded feature vectors. Class
//! probabilities are a softmax over negative squared distances to each
//! class centroid.

use super::output::ClassProbabilities;
use super::SeverityModel;
use crate::error::ClassifierError;
use crate::models::{FeatureVector, SeverityLabel};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    version: String,
    num_features: usize,
    temperature: f64,
    /// One centroid per class, `None` if the class never appeared in training
    centroids: [Option<Vec<f64>>; 3],
}

impl CentroidModel {
    pub fn fit(
        version: impl Into<String>,
        features: &[FeatureVector],
        labels: &[SeverityLabel],
    ) -> Result<Self, ClassifierError> {
        if features.is_empty() {
            return Err(ClassifierError::Training("no training rows".to_string()));
        }
        if features.len() != labels.len() {
            return Err(ClassifierError::Training(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let num_features = features[0].len();
        let mut sums = [vec![0.0; num_features], vec![0.0; num_features], vec![0.0; num_features]];
        let mut counts = [0usize; 3];

        for (row, label) in features.iter().zip(labels) {
            if row.len() != num_features {
                return Err(ClassifierError::Dimension {
                    expected: num_features,
                    actual: row.len(),
                });
            }
            let idx = label.index();
            counts[idx] += 1;
            for (acc, value) in sums[idx].iter_mut().zip(row.as_slice()) {
                *acc += f64::from(*value);
            }
        }

        let centroids: [Option<Vec<f64>>; 3] = [0, 1, 2].map(|idx| {
            (counts[idx] > 0).then(|| sums[idx].iter().map(|s| s / counts[idx] as f64).collect())
        });

        tracing::debug!(
            rows = features.len(),
            low = counts[0],
            medium = counts[1],
            high = counts[2],
            "Fitted centroid model"
        );

        Ok(Self {
            version: version.into(),
            num_features,
            temperature: DEFAULT_TEMPERATURE,
            centroids,
        })
    }

    pub fn centroid(&self, label: SeverityLabel) -> Option<&[f64]> {
        self.centroids[label.index()].as_deref()
    }
}

impl SeverityModel for CentroidModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
        if features.len() != self.num_features {
            return Err(ClassifierError::Dimension {
                expected: self.num_features,
                actual: features.len(),
            });
        }

        let mut logits = [f64::NEG_INFINITY; 3];
        for (idx, centroid) in self.centroids.iter().enumerate() {
            if let Some(centroid) = centroid {
                let d2: f64 = centroid
                    .iter()
                    .zip(features.as_slice())
                    .map(|(c, x)| (f64::from(*x) - c).powi(2))
                    .sum();
                logits[idx] = -d2 / self.temperature;
            }
        }

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(ClassifierError::InvalidOutput("model has no centroids".to_string()));
        }
        ClassProbabilities::from_weights(logits.map(|l| if l.is_finite() { (l - max).exp() } else { 0.0 }))
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}
