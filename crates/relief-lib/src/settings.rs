//! Layered configuration
//!
//! Defaults, then an optional file, then `RELIEF__*` environment variables
//! (`RELIEF__ALLOCATION__RANK_SCALE=50` sets `allocation.rank_scale`).

use crate::allocation::{AllocationPolicy, NeedPolicy};
use crate::predictor::{SeverityThresholds, LOW_CONFIDENCE_THRESHOLD};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RELIEF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Model artifact loaded when no path is given explicitly
    pub artifact_path: Option<PathBuf>,
    pub low_confidence_threshold: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            artifact_path: None,
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefSettings {
    /// Name attached to structured log events
    pub operator: String,
    pub severity: SeverityThresholds,
    pub needs: NeedPolicy,
    pub allocation: AllocationPolicy,
    pub classifier: ClassifierSettings,
}

impl Default for ReliefSettings {
    fn default() -> Self {
        Self {
            operator: "relief".to_string(),
            severity: SeverityThresholds::default(),
            needs: NeedPolicy::default(),
            allocation: AllocationPolicy::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

impl ReliefSettings {
    /// Load configuration from an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            .add_source(env.prefix_separator("__").separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}
