//! Building and inspecting model artifacts

use anyhow::{Context, Result};
use colored::Colorize;
use relief_lib::{ModelArtifact, SeverityLabel, SeverityLabeler};
use serde::Serialize;
use std::path::Path;

use crate::dataset;
use crate::output::{color_severity, print_json, print_success, OutputFormat};

#[derive(Serialize)]
struct BuildSummary<'a> {
    path: String,
    model_version: &'a str,
    backend: &'static str,
    records: usize,
    feature_names: &'a [String],
    label_counts: [(SeverityLabel, usize); 3],
}

/// Fit the reference model on labelled history and write the artifact
pub fn build(
    csv: &Path,
    out: &Path,
    model_version: &str,
    labeler: &SeverityLabeler,
    format: OutputFormat,
) -> Result<()> {
    let records = dataset::parse_history(dataset::open(csv)?)?;
    let artifact = ModelArtifact::build_reference(&records, labeler, model_version)
        .context("Failed to build model artifact")?;
    artifact
        .save(out)
        .with_context(|| format!("Failed to write artifact to {}", out.display()))?;

    let labels = labeler.label_all(&records);
    let label_counts = SeverityLabel::ALL.map(|s| (s, labels.iter().filter(|l| **l == s).count()));

    let summary = BuildSummary {
        path: out.display().to_string(),
        model_version: &artifact.model_version,
        backend: artifact.classifier.backend(),
        records: records.len(),
        feature_names: &artifact.feature_names,
        label_counts,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success(&format!("Artifact written to {}", summary.path));
            println!();
            println!("Model Version:  {}", summary.model_version.cyan());
            println!("Backend:        {}", summary.backend);
            println!("Records:        {}", summary.records);
            println!("Features:       {}", summary.feature_names.join(", "));
            println!("Labels:");
            for (severity, count) in summary.label_counts.iter().rev() {
                println!("  {:<8} {}", color_severity(*severity), count);
            }
        }
    }

    Ok(())
}
