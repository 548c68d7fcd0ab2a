//! CLI command implementations

pub mod allocate;
pub mod artifact;
pub mod assess;
pub mod config;
pub mod label;

use anyhow::{Context, Result};
use relief_lib::{ReliefPipeline, ReliefSettings};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::output::print_warning;

/// Settings and per-user config shared by every command
pub struct Session {
    pub settings: ReliefSettings,
    pub config: Config,
}

impl Session {
    pub fn load(settings_file: Option<&Path>) -> Result<Self> {
        let config = Config::load()?;
        let settings_file = settings_file.or(config.settings_file.as_deref());
        let settings = ReliefSettings::load(settings_file).with_context(|| match settings_file {
            Some(path) => format!("Failed to load settings from {}", path.display()),
            None => "Failed to load settings".to_string(),
        })?;
        Ok(Self { settings, config })
    }

    /// Artifact chosen by flag, then user config, then library settings
    pub fn artifact_path(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.config.default_artifact.clone())
            .or_else(|| self.settings.classifier.artifact_path.clone())
    }

    /// Pipeline with the chosen model loaded, or rules only when none is set.
    ///
    /// Loading goes through the process-wide model holder, so the artifact
    /// is read at most once per run.
    pub fn pipeline(&self, artifact: Option<PathBuf>) -> Result<ReliefPipeline> {
        let mut settings = self.settings.clone();
        settings.classifier.artifact_path = self.artifact_path(artifact);

        match settings.classifier.artifact_path.clone() {
            Some(path) => ReliefPipeline::from_settings(&settings)
                .with_context(|| format!("Failed to load model artifact {}", path.display())),
            None => {
                print_warning("No model artifact configured, severity comes from the rule-based labeler");
                Ok(ReliefPipeline::new(&settings))
            }
        }
    }
}
