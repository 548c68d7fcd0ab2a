//! Viewing and editing the per-user CLI config

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, PoolConfig};
use crate::output::{print_info, print_json, print_success, OutputFormat};

pub fn show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            print_info(&format!("Config file: {}", Config::config_path()?.display()));
            println!();
            let unset = || "(not set)".dimmed().to_string();
            println!(
                "Default Artifact:  {}",
                config
                    .default_artifact
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(unset)
            );
            println!(
                "Settings File:     {}",
                config
                    .settings_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(unset)
            );
            let pool = &config.default_pool;
            if pool.is_empty() {
                println!("Default Pool:      {}", unset());
            } else {
                println!("Default Pool:");
                for (name, quantity) in [
                    ("food", pool.food),
                    ("water", pool.water),
                    ("medicine", pool.medicine),
                    ("shelter", pool.shelter),
                ] {
                    println!("  {:<10} {}", name, quantity.map(|q| q.to_string()).unwrap_or_else(unset));
                }
            }
        }
    }
    Ok(())
}

/// Update the fields that were given and save
pub fn set(
    mut config: Config,
    artifact: Option<PathBuf>,
    settings_file: Option<PathBuf>,
    pool: PoolConfig,
) -> Result<()> {
    if artifact.is_some() {
        config.default_artifact = artifact;
    }
    if settings_file.is_some() {
        config.settings_file = settings_file;
    }
    config.default_pool = config.default_pool.merged(&pool);

    let path = config.save()?;
    print_success(&format!("Config saved to {}", path.display()));
    Ok(())
}

pub fn reset() -> Result<()> {
    let path = Config::default().save()?;
    print_success(&format!("Config reset at {}", path.display()));
    Ok(())
}
