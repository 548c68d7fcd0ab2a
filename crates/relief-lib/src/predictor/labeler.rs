//! Rule-based severity labelling
//!
//! Converts raw impact numbers into a severity label by summing three
//! independent per-metric sub-scores. Used to generate training labels and
//! as the fallback scorer when no model is available.

use crate::models::{DisasterRecord, SeverityLabel};
use serde::{Deserialize, Serialize};

/// Lower bounds for the middle and top sub-score of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    /// Values at or above this score 2
    pub medium: f64,
    /// Values at or above this score 3
    pub high: f64,
}

impl MetricThresholds {
    pub fn new(medium: f64, high: f64) -> Self {
        Self { medium, high }
    }

    pub fn sub_score(&self, value: f64) -> u8 {
        if value >= self.high {
            3
        } else if value >= self.medium {
            2
        } else {
            1
        }
    }
}

/// Scoring thresholds for the severity rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub deaths: MetricThresholds,
    pub people_affected: MetricThresholds,
    pub damages: MetricThresholds,
    /// Minimum total score labelled High
    pub high_score: u8,
    /// Minimum total score labelled Medium
    pub medium_score: u8,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            deaths: MetricThresholds::new(10.0, 100.0),
            people_affected: MetricThresholds::new(1_000.0, 10_000.0),
            damages: MetricThresholds::new(1_000_000.0, 10_000_000.0),
            high_score: 7,
            medium_score: 5,
        }
    }
}

/// Per-metric sub-scores behind a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub deaths: u8,
    pub people_affected: u8,
    pub damages: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.deaths + self.people_affected + self.damages
    }
}

/// Deterministic severity rule engine
#[derive(Debug, Clone, Default)]
pub struct SeverityLabeler {
    thresholds: SeverityThresholds,
}

impl SeverityLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    pub fn breakdown_impact(&self, deaths: u64, people_affected: u64, damages: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            deaths: self.thresholds.deaths.sub_score(deaths as f64),
            people_affected: self.thresholds.people_affected.sub_score(people_affected as f64),
            damages: self.thresholds.damages.sub_score(damages),
        }
    }

    pub fn breakdown(&self, record: &DisasterRecord) -> ScoreBreakdown {
        self.breakdown_impact(record.deaths, record.people_affected, record.damages)
    }

    /// Total score in [3, 9]
    pub fn score(&self, record: &DisasterRecord) -> u8 {
        self.breakdown(record).total()
    }

    pub fn label_for_score(&self, score: u8) -> SeverityLabel {
        if score >= self.thresholds.high_score {
            SeverityLabel::High
        } else if score >= self.thresholds.medium_score {
            SeverityLabel::Medium
        } else {
            SeverityLabel::Low
        }
    }

    pub fn label_impact(&self, deaths: u64, people_affected: u64, damages: f64) -> SeverityLabel {
        self.label_for_score(self.breakdown_impact(deaths, people_affected, damages).total())
    }

    /// Label a record. Depends only on deaths, people affected and damages.
    pub fn label(&self, record: &DisasterRecord) -> SeverityLabel {
        self.label_for_score(self.score(record))
    }

    /// Label a batch, e.g. to build training targets
    pub fn label_all(&self, records: &[DisasterRecord]) -> Vec<SeverityLabel> {
        let labels: Vec<SeverityLabel> = records.iter().map(|r| self.label(r)).collect();
        tracing::debug!(
            records = records.len(),
            high = labels.iter().filter(|l| **l == SeverityLabel::High).count(),
            medium = labels.iter().filter(|l| **l == SeverityLabel::Medium).count(),
            low = labels.iter().filter(|l| **l == SeverityLabel::Low).count(),
            "Generated severity labels"
        );
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisasterType;

    fn record(deaths: u64, people_affected: u64, damages: f64) -> DisasterRecord {
        DisasterRecord {
            year: 2020,
            disaster_type: DisasterType::Flood,
            region: "Assam".to_string(),
            locality: "Dhubri".to_string(),
            people_affected,
            deaths,
            damages,
        }
    }

    #[test]
    fn test_all_top_scores_is_high() {
        let labeler = SeverityLabeler::new();
        let r = record(150, 20_000, 15_000_000.0);
        assert_eq!(labeler.score(&r), 9);
        assert_eq!(labeler.label(&r), SeverityLabel::High);
    }

    #[test]
    fn test_all_bottom_scores_is_low() {
        let labeler = SeverityLabeler::new();
        let r = record(5, 500, 500_000.0);
        assert_eq!(labeler.score(&r), 3);
        assert_eq!(labeler.label(&r), SeverityLabel::Low);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let labeler = SeverityLabeler::new();
        let b = labeler.breakdown_impact(10, 1_000, 1_000_000.0);
        assert_eq!(b, ScoreBreakdown { deaths: 2, people_affected: 2, damages: 2 });
        assert_eq!(labeler.label_impact(10, 1_000, 1_000_000.0), SeverityLabel::Medium);

        let b = labeler.breakdown_impact(9, 999, 999_999.99);
        assert_eq!(b.total(), 3);
    }

    #[test]
    fn test_score_boundaries_map_to_labels() {
        let labeler = SeverityLabeler::new();
        assert_eq!(labeler.label_for_score(4), SeverityLabel::Low);
        assert_eq!(labeler.label_for_score(5), SeverityLabel::Medium);
        assert_eq!(labeler.label_for_score(6), SeverityLabel::Medium);
        assert_eq!(labeler.label_for_score(7), SeverityLabel::High);
    }

    #[test]
    fn test_label_ignores_non_impact_fields() {
        let labeler = SeverityLabeler::new();
        let a = record(40, 4_000, 2_000_000.0);
        let mut b = a.clone();
        b.year = 1999;
        b.disaster_type = DisasterType::Other("Volcano".to_string());
        b.region = "Kerala".to_string();
        b.locality = "Wayanad".to_string();
        assert_eq!(labeler.label(&a), labeler.label(&b));
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = SeverityThresholds {
            high_score: 9,
            ..SeverityThresholds::default()
        };
        let labeler = SeverityLabeler::with_thresholds(thresholds);
        assert_eq!(labeler.label_impact(150, 20_000, 1_500_000.0), SeverityLabel::Medium);
    }

    #[test]
    fn test_label_all_preserves_order() {
        let labeler = SeverityLabeler::new();
        let labels = labeler.label_all(&[record(0, 0, 0.0), record(500, 50_000, 5e7)]);
        assert_eq!(labels, vec![SeverityLabel::Low, SeverityLabel::High]);
    }
}
