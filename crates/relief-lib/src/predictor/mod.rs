//! Severity prediction engine

mod centroid;
mod features;
mod inference;
mod labeler;
mod output;

pub use centroid::{CentroidModel, DEFAULT_TEMPERATURE};
pub use features::{
    CodecState, ColumnEncoding, ColumnKind, FeatureCodec, FeatureSource, FieldValue, RawRecord,
    FEATURE_COLUMNS, UNKNOWN_CATEGORY_ID,
};
pub use inference::{InferenceStats, OnnxSeverityModel, SeverityClassifier, SLOW_INFERENCE_MS};
pub use labeler::{MetricThresholds, ScoreBreakdown, SeverityLabeler, SeverityThresholds};
pub use output::{
    ClassProbabilities, OutputConfig, OutputFormatter, PredictionSource, SeverityPrediction,
    ENTROPY_UNCERTAIN_THRESHOLD, LOW_CONFIDENCE_THRESHOLD, PROBABILITY_TOLERANCE,
};

use crate::error::ClassifierError;
use crate::models::FeatureVector;

/// A fitted multi-class severity model
pub trait SeverityModel: Send + Sync {
    /// Class distribution for one encoded record
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError>;

    /// Number of features the model was fitted on
    fn num_features(&self) -> usize;

    /// Get current model version
    fn model_version(&self) -> &str;
}
