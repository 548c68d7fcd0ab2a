//! CSV ingestion for disaster history and pending reports

use relief_lib::{DisasterRecord, DisasterReport, DisasterType, SeverityLabel};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: column '{column}' is required")]
    MissingValue { row: usize, column: &'static str },
}

pub fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Open {
        path: path.display().to_string(),
        source,
    })
}

/// Parse historical records. Empty numeric cells default to zero.
pub fn parse_history<R: Read>(reader: R) -> Result<Vec<DisasterRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (i, row) in csv_reader.deserialize::<HistoryRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|source| DatasetError::Csv { row: line, source })?;
        records.push(row.into_record(line)?);
    }

    tracing::debug!(records = records.len(), "Parsed disaster history");
    Ok(records)
}

/// Parse disasters awaiting allocation
pub fn parse_reports<R: Read>(reader: R) -> Result<Vec<DisasterReport>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut reports = Vec::new();

    for (i, row) in csv_reader.deserialize::<ReportRow>().enumerate() {
        let line = i + 2;
        let row = row.map_err(|source| DatasetError::Csv { row: line, source })?;
        reports.push(row.into_report(line)?);
    }

    tracing::debug!(reports = reports.len(), "Parsed disaster reports");
    Ok(reports)
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    year: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    disaster_type: Option<String>,
    #[serde(default)]
    region: String,
    #[serde(default)]
    locality: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    people_affected: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deaths: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    damages: Option<String>,
}

impl HistoryRow {
    fn into_record(self, row: usize) -> Result<DisasterRecord, DatasetError> {
        let disaster_type = self.disaster_type.ok_or(DatasetError::MissingValue {
            row,
            column: "disaster_type",
        })?;
        let year = parse_count(row, "year", self.year.as_deref())?;

        Ok(DisasterRecord {
            year: i32::try_from(year).map_err(|_| DatasetError::InvalidValue {
                row,
                column: "year",
                value: year.to_string(),
            })?,
            disaster_type: DisasterType::parse(&disaster_type),
            region: self.region,
            locality: self.locality,
            people_affected: parse_count(row, "people_affected", self.people_affected.as_deref())?,
            deaths: parse_count(row, "deaths", self.deaths.as_deref())?,
            damages: parse_amount(row, "damages", self.damages.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    #[serde(default)]
    location: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    disaster_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    severity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    people_affected: Option<String>,
}

impl ReportRow {
    fn into_report(self, row: usize) -> Result<DisasterReport, DatasetError> {
        let severity_text = self.severity.ok_or(DatasetError::MissingValue {
            row,
            column: "severity",
        })?;
        let severity: SeverityLabel = severity_text.parse().map_err(|_| DatasetError::InvalidValue {
            row,
            column: "severity",
            value: severity_text.clone(),
        })?;
        let disaster_type = self.disaster_type.ok_or(DatasetError::MissingValue {
            row,
            column: "disaster_type",
        })?;
        let people = parse_count(row, "people_affected", self.people_affected.as_deref())?;

        let report = DisasterReport::new(severity, people, disaster_type);
        Ok(if self.location.is_empty() {
            report
        } else {
            report.with_location(self.location)
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Non-negative whole number; accepts "1500" and "1500.0"
fn parse_count(row: usize, column: &'static str, value: Option<&str>) -> Result<u64, DatasetError> {
    let amount = parse_amount(row, column, value)?;
    if amount.fract() != 0.0 || amount > u64::MAX as f64 {
        return Err(DatasetError::InvalidValue {
            row,
            column,
            value: value.unwrap_or_default().to_string(),
        });
    }
    Ok(amount as u64)
}

fn parse_amount(row: usize, column: &'static str, value: Option<&str>) -> Result<f64, DatasetError> {
    let Some(text) = value else {
        return Ok(0.0);
    };
    let invalid = || DatasetError::InvalidValue {
        row,
        column,
        value: text.to_string(),
    };
    let amount: f64 = text.replace(',', "").parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_rows() {
        let csv = "\
year,disaster_type,region,locality,people_affected,deaths,damages
2019, Flood ,Assam,Dhubri,\"12,000\",45,2500000.0
2020,Volcano,Hawaii,Hilo,,,
";
        let records = parse_history(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].disaster_type, DisasterType::Flood);
        assert_eq!(records[0].people_affected, 12_000);
        assert_eq!(records[0].damages, 2_500_000.0);
        assert_eq!(records[1].disaster_type, DisasterType::Other("volcano".to_string()));
        assert_eq!(records[1].deaths, 0);
        assert_eq!(records[1].damages, 0.0);
    }

    #[test]
    fn test_malformed_number_reports_row() {
        let csv = "\
year,disaster_type,region,locality,people_affected,deaths,damages
2019,flood,Assam,Dhubri,100,2,10
2020,flood,Assam,Goalpara,many,2,10
";
        let err = parse_history(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InvalidValue { row: 3, column: "people_affected", .. }
        ));
    }

    #[test]
    fn test_negative_damages_rejected() {
        let csv = "year,disaster_type,region,locality,people_affected,deaths,damages\n2019,flood,A,B,1,0,-5\n";
        assert!(parse_history(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_reports() {
        let csv = "\
location,disaster_type,severity,people_affected
Bhuj,earthquake,High,5000
,flood,medium,2000.0
";
        let reports = parse_reports(csv.as_bytes()).unwrap();
        assert_eq!(reports[0].location, "Bhuj");
        assert_eq!(reports[0].severity, SeverityLabel::High);
        assert_eq!(reports[1].location, "Unknown");
        assert_eq!(reports[1].people_affected, 2000);
    }

    #[test]
    fn test_report_requires_severity() {
        let csv = "location,disaster_type,severity,people_affected\nBhuj,earthquake,,5000\n";
        assert!(matches!(
            parse_reports(csv.as_bytes()).unwrap_err(),
            DatasetError::MissingValue { row: 2, column: "severity" }
        ));
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let csv = "location,disaster_type,severity,people_affected\nBhuj,earthquake,Extreme,5000\n";
        assert!(matches!(
            parse_reports(csv.as_bytes()).unwrap_err(),
            DatasetError::InvalidValue { column: "severity", .. }
        ));
    }
}
