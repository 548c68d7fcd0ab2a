//! Severity assessment and need estimation commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use relief_lib::{Assessment, DisasterRecord, DisasterType, NeedVector, PredictionSource, ReliefPipeline, ResourceKind, SeverityLabel};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::dataset;
use crate::output::{color_confidence, color_severity, format_count, print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct AssessmentRow {
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Type")]
    disaster_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Food")]
    food: String,
    #[tabled(rename = "Water")]
    water: String,
    #[tabled(rename = "Medicine")]
    medicine: String,
    #[tabled(rename = "Shelter")]
    shelter: String,
}

#[derive(Tabled)]
struct NeedRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
}

#[derive(Serialize)]
struct AssessedRecord<'a> {
    locality: &'a str,
    region: &'a str,
    disaster_type: &'a DisasterType,
    people_affected: u64,
    #[serde(flatten)]
    assessment: &'a Assessment,
}

#[derive(Serialize)]
struct NeedReport<'a> {
    severity: SeverityLabel,
    disaster_type: &'a DisasterType,
    people_affected: u64,
    need: &'a NeedVector,
}

/// Assess every record in a history CSV
pub fn assess_records(path: &Path, pipeline: &ReliefPipeline, format: OutputFormat) -> Result<()> {
    let records = dataset::parse_history(dataset::open(path)?)?;
    let assessments: Vec<Assessment> = records
        .iter()
        .map(|r| pipeline.assess_with_fallback(r))
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<AssessedRecord> = records
                .iter()
                .zip(&assessments)
                .map(|(record, assessment)| AssessedRecord {
                    locality: &record.locality,
                    region: &record.region,
                    disaster_type: &record.disaster_type,
                    people_affected: record.people_affected,
                    assessment,
                })
                .collect();
            print_json(&output)?;
        }
        OutputFormat::Table => {
            if let Some(first) = assessments.first() {
                let at = DateTime::<Utc>::from_timestamp(first.prediction.generated_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_default();
                println!("{} {}", "Assessed at".bold(), at);
            }

            let rows: Vec<AssessmentRow> = records
                .iter()
                .zip(&assessments)
                .map(|(record, assessment)| assessment_row(record, assessment))
                .collect();
            print_table(&rows);

            for (record, assessment) in records.iter().zip(&assessments) {
                if let Some(reason) = &assessment.low_confidence_reason {
                    print_warning(&format!("{}: {}", location(record), reason));
                }
            }
        }
    }

    Ok(())
}

/// Estimate need for a single disaster
pub fn estimate_need(
    pipeline: &ReliefPipeline,
    severity: SeverityLabel,
    disaster_type: &str,
    people_affected: u64,
    format: OutputFormat,
) -> Result<()> {
    let disaster_type = DisasterType::parse(disaster_type);
    let need = pipeline
        .allocator()
        .estimator()
        .estimate(severity, &disaster_type, people_affected);

    match format {
        OutputFormat::Json => print_json(&NeedReport {
            severity,
            disaster_type: &disaster_type,
            people_affected,
            need: &need,
        })?,
        OutputFormat::Table => {
            println!(
                "{} {} {}, {} people affected",
                "Need for".bold(),
                color_severity(severity),
                disaster_type.as_str().cyan(),
                format_count(people_affected)
            );
            if !disaster_type.is_known() {
                print_warning(&format!(
                    "'{}' has no type adjustments, base rates apply unchanged",
                    disaster_type
                ));
            }
            let rows: Vec<NeedRow> = ResourceKind::ALL
                .iter()
                .map(|kind| NeedRow {
                    resource: kind.display_name().to_string(),
                    quantity: format_count(need.get(*kind)),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}

fn assessment_row(record: &DisasterRecord, assessment: &Assessment) -> AssessmentRow {
    let prediction = &assessment.prediction;
    let source = match prediction.source {
        PredictionSource::Model => prediction.model_version.clone(),
        PredictionSource::Rules => "rules".yellow().to_string(),
    };
    let need = |kind: ResourceKind| format_count(assessment.need.get(kind));

    AssessmentRow {
        location: location(record),
        disaster_type: record.disaster_type.to_string(),
        severity: color_severity(prediction.label),
        confidence: color_confidence(prediction.confidence),
        source,
        food: need(ResourceKind::FoodKits),
        water: need(ResourceKind::WaterPacks),
        medicine: need(ResourceKind::MedicineKits),
        shelter: need(ResourceKind::ShelterUnits),
    }
}

fn location(record: &DisasterRecord) -> String {
    if record.locality.is_empty() {
        record.region.clone()
    } else {
        record.locality.clone()
    }
}
