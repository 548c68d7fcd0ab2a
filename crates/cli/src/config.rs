//! Configuration management for the CLI

use anyhow::{Context, Result};
use relief_lib::{ResourceKind, ResourcePool};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-user CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model artifact used when `--artifact` is not given
    pub default_artifact: Option<PathBuf>,
    /// Library settings file used when `--settings` is not given
    pub settings_file: Option<PathBuf>,
    /// Stock used when pool flags are not given
    #[serde(default)]
    pub default_pool: PoolConfig,
}

/// Resource quantities; unset kinds count as zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PoolConfig {
    pub food: Option<i64>,
    pub water: Option<i64>,
    pub medicine: Option<i64>,
    pub shelter: Option<i64>,
}

impl PoolConfig {
    /// Overlay explicitly given quantities on top of these defaults
    pub fn merged(&self, overrides: &PoolConfig) -> PoolConfig {
        PoolConfig {
            food: overrides.food.or(self.food),
            water: overrides.water.or(self.water),
            medicine: overrides.medicine.or(self.medicine),
            shelter: overrides.shelter.or(self.shelter),
        }
    }

    pub fn to_pool(&self) -> ResourcePool {
        [
            (ResourceKind::FoodKits, self.food),
            (ResourceKind::WaterPacks, self.water),
            (ResourceKind::MedicineKits, self.medicine),
            (ResourceKind::ShelterUnits, self.shelter),
        ]
        .into_iter()
        .fold(ResourcePool::new(), |pool, (kind, quantity)| {
            pool.with(kind, quantity.unwrap_or(0))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.food.is_none() && self.water.is_none() && self.medicine.is_none() && self.shelter.is_none()
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("relief").join("config.json"))
    }
}
