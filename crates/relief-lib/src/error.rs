//! Error types for assessment, classification and allocation

use crate::models::ResourceKind;
use std::path::PathBuf;
use thiserror::Error;

/// Feature encoding failures
#[derive(Debug, Error)]
pub enum CodecError {
    /// Record is missing a required column or the value has the wrong type
    #[error("schema error: field '{field}' {detail}")]
    Schema { field: String, detail: String },

    #[error("cannot fit feature codec on an empty training set")]
    EmptyTrainingSet,
}

impl CodecError {
    pub(crate) fn missing(field: &str) -> Self {
        CodecError::Schema {
            field: field.to_string(),
            detail: "is missing".to_string(),
        }
    }

    pub(crate) fn wrong_type(field: &str, detail: impl Into<String>) -> Self {
        CodecError::Schema {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

/// Severity classifier failures
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier invoked before a model was fitted or loaded")]
    Untrained,

    #[error("feature vector has {actual} values, model expects {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced an invalid probability distribution: {0}")]
    InvalidOutput(String),

    #[error("cannot fit model: {0}")]
    Training(String),
}

/// Allocation input failures. Scarcity is never an error.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("invalid pool: {kind} has negative quantity {quantity}")]
    InvalidPool { kind: ResourceKind, quantity: i64 },

    #[error("pool ledger lock poisoned")]
    LedgerPoisoned,

    #[error("restocking {delivered} units of {kind} onto {stock} exceeds the largest pool quantity")]
    StockOverflow { kind: ResourceKind, stock: u64, delivered: u64 },
}

/// Model artifact loading and saving failures
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read or write artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported artifact format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("artifact feature order {manifest:?} does not match codec order {codec:?}")]
    FeatureOrderMismatch {
        manifest: Vec<String>,
        codec: Vec<String>,
    },

    #[error("checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Unparseable severity or resource names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseLabelError {
    #[error("unknown severity label '{0}'")]
    Severity(String),

    #[error("unknown resource kind '{0}'")]
    Resource(String),
}

/// Umbrella error for the assessment pipeline
#[derive(Debug, Error)]
pub enum ReliefError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
