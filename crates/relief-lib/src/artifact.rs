//! Model artifact persistence
//!
//! An artifact is a JSON manifest bundling the fitted codec state, the
//! feature order and the classifier. The classifier is either embedded
//! (centroid model) or a reference to an ONNX file verified by checksum.

use crate::error::{ArtifactError, ClassifierError, ReliefError};
use crate::models::{DisasterRecord, SeverityLabel};
use crate::predictor::{
    CentroidModel, CodecState, FeatureCodec, OnnxSeverityModel, SeverityClassifier,
    SeverityLabeler, SeverityModel,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info};

/// Manifest format understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// Column order emitted by offline trainers that sort class names
pub fn alphabetical_class_order() -> Vec<SeverityLabel> {
    vec![SeverityLabel::High, SeverityLabel::Low, SeverityLabel::Medium]
}

/// How the classifier is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Centroid {
        model: CentroidModel,
    },
    Onnx {
        /// Relative paths resolve against the manifest's directory
        path: PathBuf,
        sha256: String,
        #[serde(default = "alphabetical_class_order")]
        class_order: Vec<SeverityLabel>,
    },
}

impl ClassifierSpec {
    pub fn backend(&self) -> &'static str {
        match self {
            ClassifierSpec::Centroid { .. } => "centroid",
            ClassifierSpec::Onnx { .. } => "onnx",
        }
    }
}

/// Serialized {classifier, codec state, feature order} bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub codec: CodecState,
    pub classifier: ClassifierSpec,
}

/// A validated artifact ready for inference
pub struct LoadedModel {
    pub model_version: String,
    pub backend: &'static str,
    pub codec: CodecState,
    pub classifier: SeverityClassifier,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_version", &self.model_version)
            .field("backend", &self.backend)
            .field("num_features", &self.codec.num_features())
            .finish()
    }
}

impl ModelArtifact {
    pub fn new(model_version: impl Into<String>, codec: CodecState, classifier: ClassifierSpec) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model_version: model_version.into(),
            created_at: Utc::now(),
            feature_names: codec.feature_names(),
            codec,
            classifier,
        }
    }

    /// Fit the codec and the reference centroid model on labelled history.
    ///
    /// Labels come from the rule-based labeler, the same way training
    /// targets are generated for offline models.
    pub fn build_reference(
        records: &[DisasterRecord],
        labeler: &SeverityLabeler,
        model_version: impl Into<String>,
    ) -> Result<Self, ReliefError> {
        let model_version = model_version.into();
        let codec = FeatureCodec::new();
        let state = codec.fit(records)?;
        let features = records
            .iter()
            .map(|r| codec.encode(r, &state))
            .collect::<Result<Vec<_>, _>>()?;
        let labels = labeler.label_all(records);
        let model = CentroidModel::fit(model_version.clone(), &features, &labels)?;

        info!(
            records = records.len(),
            model_version = %model_version,
            "Built reference model artifact"
        );
        Ok(Self::new(model_version, state, ClassifierSpec::Centroid { model }))
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check format version and that the manifest's feature order matches the codec
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let codec_names = self.codec.feature_names();
        if self.feature_names != codec_names {
            return Err(ArtifactError::FeatureOrderMismatch {
                manifest: self.feature_names.clone(),
                codec: codec_names,
            });
        }
        Ok(())
    }

    /// Write the manifest through a temp file and rename it into place
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let json = self.to_json()?;
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_error(&temp_path))?;
        file.write_all(json.as_bytes()).map_err(io_error(&temp_path))?;
        file.sync_all().map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, path).map_err(io_error(path))?;

        debug!(path = ?path, model_version = %self.model_version, "Saved model artifact");
        Ok(())
    }

    /// Read, validate and instantiate an artifact
    pub fn load(path: &Path) -> Result<LoadedModel, ArtifactError> {
        let json = fs::read_to_string(path).map_err(io_error(path))?;
        let artifact = Self::from_json(&json)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        artifact.into_loaded(base_dir)
    }

    pub fn into_loaded(self, base_dir: &Path) -> Result<LoadedModel, ArtifactError> {
        self.validate()?;
        let num_features = self.codec.num_features();
        let backend = self.classifier.backend();

        let model: Box<dyn SeverityModel> = match self.classifier {
            ClassifierSpec::Centroid { model } => {
                if model.num_features() != num_features {
                    return Err(ClassifierError::Dimension {
                        expected: num_features,
                        actual: model.num_features(),
                    }
                    .into());
                }
                Box::new(model)
            }
            ClassifierSpec::Onnx {
                path,
                sha256,
                class_order,
            } => {
                let path = if path.is_relative() { base_dir.join(path) } else { path };
                let bytes = fs::read(&path).map_err(io_error(&path))?;
                let actual = compute_checksum(&bytes);
                if !actual.eq_ignore_ascii_case(&sha256) {
                    return Err(ArtifactError::ChecksumMismatch {
                        path,
                        expected: sha256,
                        actual,
                    });
                }
                debug!(checksum = %actual, "Model checksum validated");
                Box::new(OnnxSeverityModel::from_bytes(
                    &bytes,
                    num_features,
                    class_order,
                    self.model_version.clone(),
                )?)
            }
        };

        Ok(LoadedModel {
            model_version: self.model_version,
            backend,
            codec: self.codec,
            classifier: SeverityClassifier::with_model(model),
        })
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io { path, source }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

static SHARED_MODEL: OnceLock<Arc<LoadedModel>> = OnceLock::new();
static SHARED_MODEL_INIT: Mutex<()> = Mutex::new(());

/// Process-wide model, loaded from `path` on first use.
///
/// Later calls return the same instance whatever path they pass; there is
/// no reload.
pub fn shared_model(path: &Path) -> Result<Arc<LoadedModel>, ArtifactError> {
    if let Some(model) = SHARED_MODEL.get() {
        return Ok(Arc::clone(model));
    }

    let _guard = SHARED_MODEL_INIT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(model) = SHARED_MODEL.get() {
        return Ok(Arc::clone(model));
    }

    let model = Arc::new(ModelArtifact::load(path)?);
    info!(
        path = ?path,
        model_version = %model.model_version,
        backend = model.backend,
        "Loaded shared severity model"
    );
    Ok(Arc::clone(SHARED_MODEL.get_or_init(|| model)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisasterType;
    use tempfile::TempDir;

    fn history() -> Vec<DisasterRecord> {
        let rows = [
            (2015, "flood", "Assam", "Dhubri", 50_000, 120, 2.0e7),
            (2016, "earthquake", "Gujarat", "Bhuj", 30_000, 300, 5.0e7),
            (2017, "drought", "Rajasthan", "Barmer", 2_000, 12, 3.0e6),
            (2018, "cyclone", "Odisha", "Puri", 4_000, 20, 1.5e6),
            (2019, "landslide", "Kerala", "Wayanad", 300, 2, 2.0e5),
            (2020, "flood", "Bihar", "Patna", 500, 1, 1.0e5),
        ];
        rows.iter()
            .map(|(year, kind, region, locality, people, deaths, damages)| DisasterRecord {
                year: *year,
                disaster_type: DisasterType::parse(kind),
                region: region.to_string(),
                locality: locality.to_string(),
                people_affected: *people,
                deaths: *deaths,
                damages: *damages,
            })
            .collect()
    }

    fn reference_artifact() -> ModelArtifact {
        ModelArtifact::build_reference(&history(), &SeverityLabeler::new(), "centroid-test").unwrap()
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"relief model");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"relief model"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let artifact = reference_artifact();
        artifact.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.model_version, "centroid-test");
        assert_eq!(loaded.backend, "centroid");
        assert_eq!(loaded.codec.feature_names(), artifact.feature_names);

        let record = &history()[1];
        let features = loaded.codec.encode(record).unwrap();
        assert_eq!(loaded.classifier.predict(&features).unwrap(), SeverityLabel::High);
    }

    #[test]
    fn test_feature_order_serialized() {
        let json = reference_artifact().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["feature_names"][0], "year");
        assert_eq!(value["feature_names"][6], "damages");
        assert_eq!(value["classifier"]["backend"], "centroid");
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut artifact = reference_artifact();
        artifact.format_version = 99;
        assert!(matches!(
            artifact.validate(),
            Err(ArtifactError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_feature_order_mismatch_rejected() {
        let mut artifact = reference_artifact();
        artifact.feature_names.swap(0, 1);
        assert!(matches!(
            artifact.into_loaded(Path::new(".")),
            Err(ArtifactError::FeatureOrderMismatch { .. })
        ));
    }

    #[test]
    fn test_onnx_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("model.onnx"), b"weights").unwrap();

        let artifact = ModelArtifact::new(
            "onnx-test",
            reference_artifact().codec,
            ClassifierSpec::Onnx {
                path: PathBuf::from("model.onnx"),
                sha256: compute_checksum(b"other weights"),
                class_order: alphabetical_class_order(),
            },
        );
        assert!(matches!(
            artifact.into_loaded(dir.path()),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_onnx_invalid_model_fails_to_load() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("model.onnx"), b"weights").unwrap();

        let artifact = ModelArtifact::new(
            "onnx-test",
            reference_artifact().codec,
            ClassifierSpec::Onnx {
                path: PathBuf::from("model.onnx"),
                sha256: compute_checksum(b"weights"),
                class_order: alphabetical_class_order(),
            },
        );
        assert!(matches!(
            artifact.into_loaded(dir.path()),
            Err(ArtifactError::Classifier(ClassifierError::Load(_)))
        ));
    }

    #[test]
    fn test_onnx_class_order_defaults_to_alphabetical() {
        let json = r#"{"backend": "onnx", "path": "m.onnx", "sha256": "00"}"#;
        let spec: ClassifierSpec = serde_json::from_str(json).unwrap();
        match spec {
            ClassifierSpec::Onnx { class_order, .. } => {
                assert_eq!(class_order, alphabetical_class_order())
            }
            other => panic!("unexpected spec {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelArtifact::load(&dir.path().join("absent.json")),
            Err(ArtifactError::Io { .. })
        ));
    }

    #[test]
    fn test_shared_model_loads_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        reference_artifact().save(&path).unwrap();

        let first = shared_model(&path).unwrap();
        let second = shared_model(&dir.path().join("elsewhere.json")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
