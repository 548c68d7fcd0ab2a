//! Per-disaster resource need estimation

use crate::models::{DisasterType, NeedVector, PerSeverity, ResourceKind, SeverityLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rates and multipliers behind need estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedPolicy {
    /// Units per affected person. Kinds without a rate are never needed.
    pub base_rates: BTreeMap<ResourceKind, f64>,
    pub severity_multipliers: PerSeverity<f64>,
    /// Per-type factors; unlisted types and kinds use 1.0
    pub type_adjustments: BTreeMap<DisasterType, BTreeMap<ResourceKind, f64>>,
}

impl Default for NeedPolicy {
    fn default() -> Self {
        use ResourceKind::*;

        let base_rates = [
            (FoodKits, 0.8),
            (WaterPacks, 1.2),
            (MedicineKits, 0.3),
            (ShelterUnits, 0.25),
        ]
        .into_iter()
        .collect();

        let table: [(DisasterType, &[(ResourceKind, f64)]); 6] = [
            (
                DisasterType::Flood,
                &[(WaterPacks, 1.2), (ShelterUnits, 1.3), (MedicineKits, 1.1)],
            ),
            (
                DisasterType::Earthquake,
                &[(ShelterUnits, 1.5), (MedicineKits, 1.3), (FoodKits, 1.1)],
            ),
            (
                DisasterType::Cyclone,
                &[(ShelterUnits, 1.4), (WaterPacks, 1.2), (FoodKits, 1.1)],
            ),
            (
                DisasterType::Drought,
                &[(WaterPacks, 1.6), (FoodKits, 1.3), (MedicineKits, 0.8)],
            ),
            (
                DisasterType::Landslide,
                &[(MedicineKits, 1.4), (ShelterUnits, 1.2), (FoodKits, 1.1)],
            ),
            (
                DisasterType::Wildfire,
                &[(MedicineKits, 1.3), (WaterPacks, 1.2), (ShelterUnits, 1.1)],
            ),
        ];

        Self {
            base_rates,
            severity_multipliers: PerSeverity::new(1.0, 1.2, 1.5),
            type_adjustments: table
                .into_iter()
                .map(|(kind, factors)| (kind, factors.iter().copied().collect()))
                .collect(),
        }
    }
}

impl NeedPolicy {
    pub fn type_adjustment(&self, disaster_type: &DisasterType, kind: ResourceKind) -> f64 {
        self.type_adjustments
            .get(disaster_type)
            .and_then(|factors| factors.get(&kind))
            .copied()
            .unwrap_or(1.0)
    }
}

/// Maps (severity, type, people affected) to required quantities
#[derive(Debug, Clone, Default)]
pub struct NeedEstimator {
    policy: NeedPolicy,
}

impl NeedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NeedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &NeedPolicy {
        &self.policy
    }

    /// Required units per resource kind.
    ///
    /// Each kind needs at least one unit once anyone is affected. Zero people
    /// affected needs nothing.
    pub fn estimate(
        &self,
        severity: SeverityLabel,
        disaster_type: &DisasterType,
        people_affected: u64,
    ) -> NeedVector {
        let mut need = NeedVector::zeroed();
        if people_affected == 0 {
            return need;
        }

        let people = people_affected as f64;
        let multiplier = self.policy.severity_multipliers.get(severity);
        for (kind, rate) in &self.policy.base_rates {
            let raw = people * rate * multiplier * self.policy.type_adjustment(disaster_type, *kind);
            // Float to int casts saturate, NaN becomes 0
            let quantity = if raw.is_finite() { raw.floor() as u64 } else { 0 };
            need.set(*kind, quantity.max(1));
        }
        need
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_earthquake_need() {
        let need = NeedEstimator::new().estimate(SeverityLabel::High, &DisasterType::Earthquake, 5000);
        assert_eq!(need.get(ResourceKind::FoodKits), 6600);
        assert_eq!(need.get(ResourceKind::MedicineKits), 2925);
        assert_eq!(need.get(ResourceKind::ShelterUnits), 2812);
    }

    #[test]
    fn test_low_drought_need() {
        let need = NeedEstimator::new().estimate(SeverityLabel::Low, &DisasterType::Drought, 800);
        assert_eq!(need.get(ResourceKind::FoodKits), 832);
        assert_eq!(need.get(ResourceKind::MedicineKits), 192);
        assert_eq!(need.get(ResourceKind::ShelterUnits), 200);
    }

    #[test]
    fn test_unknown_type_is_neutral() {
        let estimator = NeedEstimator::new();
        let other = estimator.estimate(SeverityLabel::Low, &DisasterType::parse("Volcano"), 1000);
        assert_eq!(other.get(ResourceKind::FoodKits), 800);
        assert_eq!(other.get(ResourceKind::ShelterUnits), 250);

        let tsunami = estimator.estimate(SeverityLabel::Low, &DisasterType::Tsunami, 1000);
        assert_eq!(tsunami, other);
    }

    #[test]
    fn test_compound_type_name_gets_no_adjustment() {
        let estimator = NeedEstimator::new();
        let flash = estimator.estimate(SeverityLabel::Low, &DisasterType::parse("Flash Flood"), 1000);
        assert_eq!(flash.get(ResourceKind::ShelterUnits), 250);
        let flood = estimator.estimate(SeverityLabel::Low, &DisasterType::parse("FLOOD"), 1000);
        assert_eq!(flood.get(ResourceKind::ShelterUnits), 325);
    }

    #[test]
    fn test_small_population_needs_at_least_one() {
        let need = NeedEstimator::new().estimate(SeverityLabel::Low, &DisasterType::Flood, 1);
        assert!(need.iter().all(|(_, qty)| qty == 1));
    }

    #[test]
    fn test_zero_people_needs_nothing() {
        let need = NeedEstimator::new().estimate(SeverityLabel::High, &DisasterType::Flood, 0);
        assert_eq!(need.total(), 0);
        assert_eq!(need.iter().count(), ResourceKind::ALL.len());
    }

    #[test]
    fn test_severity_scales_need() {
        let estimator = NeedEstimator::new();
        let low = estimator.estimate(SeverityLabel::Low, &DisasterType::Flood, 10_000);
        let high = estimator.estimate(SeverityLabel::High, &DisasterType::Flood, 10_000);
        for kind in ResourceKind::ALL {
            assert!(high.get(kind) > low.get(kind));
        }
    }

    #[test]
    fn test_policy_serde_round_trip() {
        let policy = NeedPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"flood\""));
        assert!(json.contains("\"water_packs\""));
        let back: NeedPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
