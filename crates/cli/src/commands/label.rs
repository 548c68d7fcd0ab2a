//! Rule-based severity labelling of historical records

use anyhow::Result;
use colored::Colorize;
use relief_lib::{DisasterRecord, SeverityLabel, SeverityLabeler};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::dataset;
use crate::output::{color_severity, format_count, format_damages, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Type")]
    disaster_type: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Deaths")]
    deaths: String,
    #[tabled(rename = "Affected")]
    people_affected: String,
    #[tabled(rename = "Damages")]
    damages: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Severity")]
    severity: String,
}

#[derive(Serialize)]
struct LabelledRecord<'a> {
    #[serde(flatten)]
    record: &'a DisasterRecord,
    score: u8,
    severity: SeverityLabel,
}

/// Label every record in a history CSV
pub fn label_history(path: &Path, labeler: &SeverityLabeler, format: OutputFormat) -> Result<()> {
    let records = dataset::parse_history(dataset::open(path)?)?;

    let labelled: Vec<LabelledRecord> = records
        .iter()
        .map(|record| {
            let score = labeler.score(record);
            LabelledRecord {
                record,
                score,
                severity: labeler.label_for_score(score),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&labelled)?,
        OutputFormat::Table => {
            let rows: Vec<LabelRow> = labelled
                .iter()
                .map(|l| {
                    let breakdown = labeler.breakdown(l.record);
                    LabelRow {
                        year: l.record.year,
                        disaster_type: l.record.disaster_type.to_string(),
                        location: location(l.record),
                        deaths: format_count(l.record.deaths),
                        people_affected: format_count(l.record.people_affected),
                        damages: format_damages(l.record.damages),
                        score: format!(
                            "{} ({}+{}+{})",
                            l.score, breakdown.deaths, breakdown.people_affected, breakdown.damages
                        ),
                        severity: color_severity(l.severity),
                    }
                })
                .collect();
            print_table(&rows);

            let mut counts: BTreeMap<SeverityLabel, usize> = BTreeMap::new();
            for l in &labelled {
                *counts.entry(l.severity).or_default() += 1;
            }
            println!();
            println!("{}", "Label Distribution".bold());
            for severity in SeverityLabel::ALL.iter().rev() {
                println!(
                    "  {:<8} {}",
                    color_severity(*severity),
                    counts.get(severity).copied().unwrap_or(0)
                );
            }
        }
    }

    Ok(())
}

fn location(record: &DisasterRecord) -> String {
    match (record.locality.is_empty(), record.region.is_empty()) {
        (true, true) => "-".to_string(),
        (true, false) => record.region.clone(),
        (false, true) => record.locality.clone(),
        (false, false) => format!("{}, {}", record.locality, record.region),
    }
}
