//! Allocation pass over a list of disasters

use anyhow::Result;
use colored::Colorize;
use relief_lib::{AllocationResult, Assessment, ReliefPipeline, ResourceKind, ResourcePool, SeverityLabel};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::dataset;
use crate::output::{
    color_fulfillment, color_severity, format_count, format_percent, print_json, print_table,
    print_warning, OutputFormat,
};

/// Where severities for the pass come from
pub enum Input<'a> {
    /// Reports that already carry a severity
    Reports(&'a Path),
    /// Raw history rows, assessed before allocating
    History(&'a Path),
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Type")]
    disaster_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Affected")]
    people_affected: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Food")]
    food: String,
    #[tabled(rename = "Water")]
    water: String,
    #[tabled(rename = "Medicine")]
    medicine: String,
    #[tabled(rename = "Shelter")]
    shelter: String,
    #[tabled(rename = "Fulfilled")]
    fulfilled: String,
}

#[derive(Tabled)]
struct StockRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Needed")]
    needed: String,
    #[tabled(rename = "Allocated")]
    allocated: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
}

#[derive(Serialize)]
struct AllocationOutput<'a> {
    pool: &'a ResourcePool,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessments: Option<&'a [Assessment]>,
    #[serde(flatten)]
    result: &'a AllocationResult,
}

/// Run one allocation pass and print the outcome
pub fn run(input: Input<'_>, pipeline: &ReliefPipeline, pool: &ResourcePool, format: OutputFormat) -> Result<()> {
    if ResourceKind::ALL.iter().all(|kind| pool.get(*kind) == 0) {
        print_warning("Resource pool is empty; pass --food/--water/--medicine/--shelter or set a default pool");
    }

    let (assessments, result) = match input {
        Input::Reports(path) => {
            let reports = dataset::parse_reports(dataset::open(path)?)?;
            (None, pipeline.allocate(&reports, pool)?)
        }
        Input::History(path) => {
            let records = dataset::parse_history(dataset::open(path)?)?;
            let (assessments, result) = pipeline.assess_and_allocate(&records, pool)?;
            (Some(assessments), result)
        }
    };

    match format {
        OutputFormat::Json => print_json(&AllocationOutput {
            pool,
            assessments: assessments.as_deref(),
            result: &result,
        })?,
        OutputFormat::Table => print_report(&result, pool),
    }

    Ok(())
}

fn print_report(result: &AllocationResult, pool: &ResourcePool) {
    println!("{}", "Allocation".bold());
    let rows: Vec<RecordRow> = result
        .records
        .iter()
        .map(|record| {
            let cell = |kind: ResourceKind| {
                let allocated = record.allocated.get(kind);
                let need = record.need.get(kind);
                if allocated < need {
                    format!("{}/{}", format_count(allocated), format_count(need))
                        .yellow()
                        .to_string()
                } else {
                    format_count(allocated)
                }
            };
            RecordRow {
                index: record.disaster_index,
                location: record.location.clone(),
                disaster_type: record.disaster_type.to_string(),
                severity: color_severity(record.severity),
                people_affected: format_count(record.people_affected),
                priority: format!("{:.1}", record.priority_score),
                food: cell(ResourceKind::FoodKits),
                water: cell(ResourceKind::WaterPacks),
                medicine: cell(ResourceKind::MedicineKits),
                shelter: cell(ResourceKind::ShelterUnits),
                fulfilled: color_fulfillment(record.fulfillment_rate),
            }
        })
        .collect();
    print_table(&rows);

    let summary = &result.summary;
    println!();
    println!("{}", "Stock".bold());
    let stock: Vec<StockRow> = ResourceKind::ALL
        .iter()
        .map(|kind| StockRow {
            resource: kind.display_name().to_string(),
            available: format_count(pool.get(*kind).max(0) as u64),
            needed: format_count(summary.total_need.get(*kind)),
            allocated: format_count(summary.total_allocated.get(*kind)),
            remaining: format_count(summary.remaining.get(*kind)),
            utilization: format_percent(summary.utilization.get(kind).copied().unwrap_or(0.0)),
        })
        .collect();
    print_table(&stock);

    println!();
    println!("{}", "Summary".bold());
    println!("Disasters:            {}", summary.total_disasters);
    println!("People Affected:      {}", format_count(summary.total_people_affected));
    println!("Overall Fulfillment:  {}", color_fulfillment(result.fulfillment_rate()));
    for severity in SeverityLabel::ALL.iter().rev() {
        if let Some(rate) = summary.average_fulfillment.get(severity) {
            println!("  {:<8} avg {}", color_severity(*severity), color_fulfillment(*rate));
        }
    }

    let short: Vec<&str> = result
        .records
        .iter()
        .filter(|r| r.unmet.total() > 0)
        .map(|r| r.location.as_str())
        .collect();
    if !short.is_empty() {
        println!();
        print_warning(&format!("Unmet need at: {}", short.join(", ")));
    }
}
