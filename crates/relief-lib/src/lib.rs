//! Disaster severity assessment and relief allocation library
//!
//! This crate provides the core functionality for:
//! - Rule-based severity labelling of reported disasters
//! - Feature encoding and ML-backed severity classification
//! - Per-disaster resource need estimation
//! - Priority-ordered, fair-share allocation of a shared resource pool
//! - Model artifact loading, configuration and observability

pub mod allocation;
pub mod artifact;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod settings;

pub use allocation::{
    AllocationPolicy, AllocationRecord, AllocationResult, AllocationSummary, NeedEstimator,
    NeedPolicy, PoolLedger, ResourceAllocator,
};
pub use artifact::{shared_model, ClassifierSpec, LoadedModel, ModelArtifact};
pub use error::{
    AllocationError, ArtifactError, ClassifierError, CodecError, ParseLabelError, ReliefError,
};
pub use models::*;
pub use observability::{ReliefMetrics, StructuredLogger};
pub use pipeline::{Assessment, ReliefPipeline};
pub use predictor::{
    CentroidModel, ClassProbabilities, CodecState, FeatureCodec, FeatureSource,
    OnnxSeverityModel, PredictionSource, RawRecord, SeverityClassifier, SeverityLabeler,
    SeverityModel, SeverityPrediction, SeverityThresholds,
};
pub use settings::{ClassifierSettings, ReliefSettings};
