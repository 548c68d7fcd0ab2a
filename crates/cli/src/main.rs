//! Relief CLI
//!
//! A command-line tool for labelling disaster history, building severity
//! model artifacts, assessing new disasters and allocating relief stock.

mod commands;
mod config;
mod dataset;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{allocate, artifact, assess, label, Session};
use relief_lib::{ReliefMetrics, SeverityLabel};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Disaster severity assessment and relief allocation
#[derive(Parser)]
#[command(name = "relief")]
#[command(author, version, about = "CLI for Disaster Relief Allocation", long_about = None)]
pub struct Cli {
    /// Settings file (can also be set via RELIEF_SETTINGS env var)
    #[arg(long, env = "RELIEF_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label historical records with the rule-based severity labeler
    Label {
        /// History CSV (year, disaster_type, region, locality, people_affected, deaths, damages)
        csv: PathBuf,
    },

    /// Fit the reference model on labelled history and write an artifact
    BuildArtifact {
        /// History CSV used for fitting
        csv: PathBuf,

        /// Output artifact path
        #[arg(long, short, default_value = "severity-model.json")]
        out: PathBuf,

        /// Version string stored in the artifact
        #[arg(long, default_value = "centroid-v1")]
        model_version: String,
    },

    /// Predict severity and estimate need for each record
    Assess {
        /// History CSV of records to assess
        csv: PathBuf,

        /// Model artifact (falls back to config, then rules)
        #[arg(long, short)]
        artifact: Option<PathBuf>,
    },

    /// Estimate resource need for one disaster
    Needs {
        /// Severity (low, medium, high)
        #[arg(long, short)]
        severity: SeverityLabel,

        /// Disaster type (flood, earthquake, cyclone, ...)
        #[arg(long = "type", short = 't')]
        disaster_type: String,

        /// Number of people affected
        #[arg(long, short)]
        people: u64,
    },

    /// Allocate a resource pool across disasters
    Allocate {
        /// Reports CSV (location, disaster_type, severity, people_affected)
        csv: PathBuf,

        /// Treat the CSV as raw history and assess severity first
        #[arg(long)]
        assess: bool,

        /// Model artifact used with --assess
        #[arg(long, short, requires = "assess")]
        artifact: Option<PathBuf>,

        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Resource quantities; unset kinds fall back to the configured default pool
#[derive(Args, Debug, Default)]
pub struct PoolArgs {
    /// Food kits available
    #[arg(long)]
    pub food: Option<i64>,

    /// Water packs available
    #[arg(long)]
    pub water: Option<i64>,

    /// Medicine kits available
    #[arg(long)]
    pub medicine: Option<i64>,

    /// Shelter units available
    #[arg(long)]
    pub shelter: Option<i64>,
}

impl PoolArgs {
    fn to_config(&self) -> config::PoolConfig {
        config::PoolConfig {
            food: self.food,
            water: self.water,
            medicine: self.medicine,
            shelter: self.shelter,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set configuration values
    Set {
        /// Default model artifact
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// Default settings file
        #[arg(long)]
        settings_file: Option<PathBuf>,

        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Restore the default configuration
    Reset,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let session = Session::load(cli.settings.as_deref())?;
    let labeler = relief_lib::SeverityLabeler::with_thresholds(session.settings.severity.clone());

    match cli.command {
        Commands::Label { csv } => {
            label::label_history(&csv, &labeler, cli.format)?;
        }
        Commands::BuildArtifact {
            csv,
            out,
            model_version,
        } => {
            artifact::build(&csv, &out, &model_version, &labeler, cli.format)?;
        }
        Commands::Assess { csv, artifact } => {
            let pipeline = session.pipeline(artifact)?;
            assess::assess_records(&csv, &pipeline, cli.format)?;
        }
        Commands::Needs {
            severity,
            disaster_type,
            people,
        } => {
            let pipeline = relief_lib::ReliefPipeline::new(&session.settings);
            assess::estimate_need(&pipeline, severity, &disaster_type, people, cli.format)?;
        }
        Commands::Allocate {
            csv,
            assess,
            artifact,
            pool,
        } => {
            let pool = session.config.default_pool.merged(&pool.to_config()).to_pool();
            if assess {
                let pipeline = session.pipeline(artifact)?;
                allocate::run(allocate::Input::History(&csv), &pipeline, &pool, cli.format)?;
            } else {
                let pipeline = relief_lib::ReliefPipeline::new(&session.settings);
                allocate::run(allocate::Input::Reports(&csv), &pipeline, &pool, cli.format)?;
            }
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                commands::config::show(&session.config, cli.format)?;
            }
            ConfigCommands::Set {
                artifact,
                settings_file,
                pool,
            } => {
                commands::config::set(session.config, artifact, settings_file, pool.to_config())?;
            }
            ConfigCommands::Reset => {
                commands::config::reset()?;
            }
        },
    }

    if cli.print_metrics {
        eprintln!("{}", ReliefMetrics::new().render());
    }

    Ok(())
}
