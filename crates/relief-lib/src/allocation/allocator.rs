//! Priority-ordered, fair-share allocation of a finite resource pool
//!
//! Disasters are ranked by severity and then by the order of magnitude of
//! the affected population. The ranked list is walked once: each disaster
//! gets its full need while stock lasts, and a weighted proportional share of
//! what remains once it does not.

use super::need::NeedEstimator;
use crate::error::AllocationError;
use crate::models::{
    DisasterReport, DisasterType, NeedVector, PerSeverity, ResourceKind, ResourcePool,
    ResourceVector, SeverityLabel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Severity ranks and rationing weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    /// Fraction of the proportional share granted under scarcity
    pub severity_weights: PerSeverity<f64>,
    pub severity_ranks: PerSeverity<u32>,
    /// Rank multiplier; keeps the population term from reordering bands
    pub rank_scale: f64,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            severity_weights: PerSeverity::new(0.2, 0.3, 0.5),
            severity_ranks: PerSeverity::new(1, 2, 3),
            rank_scale: 100.0,
        }
    }
}

/// Outcome for one disaster in a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Position of the disaster in the caller's input list
    pub disaster_index: usize,
    pub location: String,
    pub disaster_type: DisasterType,
    pub severity: SeverityLabel,
    pub people_affected: u64,
    pub priority_score: f64,
    pub need: NeedVector,
    pub allocated: ResourceVector,
    pub unmet: ResourceVector,
    /// Share of total need that was met, in [0, 1]
    pub fulfillment_rate: f64,
}

/// Pass-level aggregate statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_disasters: usize,
    pub total_people_affected: u64,
    pub total_need: ResourceVector,
    pub total_allocated: ResourceVector,
    /// Stock left after the pass
    pub remaining: ResourceVector,
    /// Fraction of each kind's stock handed out
    pub utilization: BTreeMap<ResourceKind, f64>,
    /// Mean fulfillment rate for each severity present in the pass
    pub average_fulfillment: BTreeMap<SeverityLabel, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Records in processing (priority) order
    pub records: Vec<AllocationRecord>,
    pub summary: AllocationSummary,
}

impl AllocationResult {
    /// Record for the disaster at `index` of the input list
    pub fn record_for(&self, index: usize) -> Option<&AllocationRecord> {
        self.records.iter().find(|r| r.disaster_index == index)
    }

    /// Overall share of total need that was met
    pub fn fulfillment_rate(&self) -> f64 {
        fulfillment(self.summary.total_allocated.total(), self.summary.total_need.total())
    }
}

/// Deterministic single-pass allocator
#[derive(Debug, Clone, Default)]
pub struct ResourceAllocator {
    estimator: NeedEstimator,
    policy: AllocationPolicy,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(estimator: NeedEstimator, policy: AllocationPolicy) -> Self {
        Self { estimator, policy }
    }

    pub fn estimator(&self) -> &NeedEstimator {
        &self.estimator
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// `rank * scale + log10(max(1, people))`
    pub fn priority_score(&self, severity: SeverityLabel, people_affected: u64) -> f64 {
        let rank = f64::from(self.policy.severity_ranks.get(severity));
        rank * self.policy.rank_scale + (people_affected.max(1) as f64).log10()
    }

    /// Weighted proportional share of `remaining` for one disaster, capped at
    /// both `remaining` and `need`
    pub fn fair_share(&self, severity: SeverityLabel, need: u64, total_need: u64, remaining: u64) -> u64 {
        if total_need == 0 || need == 0 || remaining == 0 {
            return 0;
        }
        let share = remaining as f64 * (need as f64 / total_need as f64)
            * self.policy.severity_weights.get(severity);
        let share = if share.is_finite() && share > 0.0 { share.floor() as u64 } else { 0 };
        share.min(remaining).min(need)
    }

    /// Allocate `pool` across `disasters`.
    ///
    /// The caller's pool is never modified; the depleted copy is returned as
    /// `summary.remaining`. Scarcity is not an error.
    pub fn allocate(
        &self,
        disasters: &[DisasterReport],
        pool: &ResourcePool,
    ) -> Result<AllocationResult, AllocationError> {
        let stock = pool.validate()?;

        let needs: Vec<NeedVector> = disasters
            .iter()
            .map(|d| {
                self.estimator
                    .estimate(d.severity, &d.disaster_type, d.people_affected)
            })
            .collect();

        let mut total_need = ResourceVector::zeroed();
        for need in &needs {
            for (kind, qty) in need.iter() {
                total_need.add(kind, qty);
            }
        }

        let priorities: Vec<f64> = disasters
            .iter()
            .map(|d| self.priority_score(d.severity, d.people_affected))
            .collect();

        // Stable sort keeps input order for equal priorities
        let mut order: Vec<usize> = (0..disasters.len()).collect();
        order.sort_by(|a, b| priorities[*b].total_cmp(&priorities[*a]));

        let mut remaining = stock.clone();
        let records: Vec<AllocationRecord> = order
            .into_iter()
            .map(|index| {
                self.allocate_one(
                    index,
                    &disasters[index],
                    &needs[index],
                    &total_need,
                    priorities[index],
                    &mut remaining,
                )
            })
            .collect();

        let summary = summarize(&records, &stock, total_need, remaining);
        info!(
            disasters = summary.total_disasters,
            total_need = summary.total_need.total(),
            total_allocated = summary.total_allocated.total(),
            "Allocation pass complete"
        );

        Ok(AllocationResult { records, summary })
    }

    /// Allocate for a single disaster and return its record
    pub fn allocate_single(
        &self,
        severity: SeverityLabel,
        people_affected: u64,
        disaster_type: impl Into<DisasterType>,
        pool: &ResourcePool,
    ) -> Result<AllocationRecord, AllocationError> {
        let mut remaining = pool.validate()?;
        let report = DisasterReport::new(severity, people_affected, disaster_type);
        let need = self
            .estimator
            .estimate(report.severity, &report.disaster_type, report.people_affected);
        let priority = self.priority_score(severity, people_affected);
        Ok(self.allocate_one(0, &report, &need, &need, priority, &mut remaining))
    }

    /// Grant one disaster its share of `remaining`, depleting it
    fn allocate_one(
        &self,
        index: usize,
        disaster: &DisasterReport,
        need: &NeedVector,
        total_need: &ResourceVector,
        priority: f64,
        remaining: &mut ResourceVector,
    ) -> AllocationRecord {
        let mut allocated = ResourceVector::zeroed();
        let mut unmet = ResourceVector::zeroed();

        for kind in ResourceKind::ALL {
            let needed = need.get(kind);
            let available = remaining.get(kind);
            let granted = if needed <= available {
                needed
            } else {
                self.fair_share(disaster.severity, needed, total_need.get(kind), available)
            };
            remaining.set(kind, available - granted);
            allocated.set(kind, granted);
            unmet.set(kind, needed - granted);
        }

        let fulfillment_rate = fulfillment(allocated.total(), need.total());
        debug!(
            disaster_index = index,
            location = %disaster.location,
            severity = %disaster.severity,
            priority = priority,
            fulfillment_rate = fulfillment_rate,
            "Allocated disaster"
        );

        AllocationRecord {
            disaster_index: index,
            location: disaster.location.clone(),
            disaster_type: disaster.disaster_type.clone(),
            severity: disaster.severity,
            people_affected: disaster.people_affected,
            priority_score: priority,
            need: need.clone(),
            allocated,
            unmet,
            fulfillment_rate,
        }
    }
}

fn fulfillment(allocated: u64, need: u64) -> f64 {
    if need == 0 {
        1.0
    } else {
        allocated as f64 / need as f64
    }
}

fn summarize(
    records: &[AllocationRecord],
    stock: &ResourceVector,
    total_need: ResourceVector,
    remaining: ResourceVector,
) -> AllocationSummary {
    let mut total_allocated = ResourceVector::zeroed();
    for record in records {
        for (kind, qty) in record.allocated.iter() {
            total_allocated.add(kind, qty);
        }
    }

    let utilization = ResourceKind::ALL
        .iter()
        .map(|kind| {
            let initial = stock.get(*kind);
            let used = initial - remaining.get(*kind);
            let rate = if initial == 0 { 0.0 } else { used as f64 / initial as f64 };
            (*kind, rate)
        })
        .collect();

    let mut bands: BTreeMap<SeverityLabel, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = bands.entry(record.severity).or_insert((0.0, 0));
        entry.0 += record.fulfillment_rate;
        entry.1 += 1;
    }
    let average_fulfillment = bands
        .into_iter()
        .map(|(severity, (sum, count))| (severity, sum / count as f64))
        .collect();

    AllocationSummary {
        total_disasters: records.len(),
        total_people_affected: records.iter().map(|r| r.people_affected).sum(),
        total_need,
        total_allocated,
        remaining,
        utilization,
        average_fulfillment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(food: i64, water: i64, medicine: i64, shelter: i64) -> ResourcePool {
        ResourcePool::new()
            .with(ResourceKind::FoodKits, food)
            .with(ResourceKind::WaterPacks, water)
            .with(ResourceKind::MedicineKits, medicine)
            .with(ResourceKind::ShelterUnits, shelter)
    }

    fn scenario_a() -> Vec<DisasterReport> {
        vec![
            DisasterReport::new(SeverityLabel::Low, 800, "drought").with_location("Barmer"),
            DisasterReport::new(SeverityLabel::High, 5000, "earthquake").with_location("Bhuj"),
            DisasterReport::new(SeverityLabel::Medium, 2000, "flood").with_location("Patna"),
        ]
    }

    fn assert_invariants(result: &AllocationResult, pool: &ResourcePool) {
        let stock = pool.validate().unwrap();
        for kind in ResourceKind::ALL {
            let allocated: u64 = result.records.iter().map(|r| r.allocated.get(kind)).sum();
            assert!(allocated <= stock.get(kind), "conservation violated for {}", kind);
            assert_eq!(allocated + result.summary.remaining.get(kind), stock.get(kind));
        }
        for record in &result.records {
            for kind in ResourceKind::ALL {
                assert!(record.allocated.get(kind) <= record.need.get(kind));
                assert_eq!(record.allocated.get(kind) + record.unmet.get(kind), record.need.get(kind));
            }
            assert!((0.0..=1.0).contains(&record.fulfillment_rate));
        }
    }

    #[test]
    fn test_scenario_a_mixed_scarcity() {
        let allocator = ResourceAllocator::new();
        let pool = pool(10_000, 15_000, 5_000, 3_000);
        let result = allocator.allocate(&scenario_a(), &pool).unwrap();
        assert_invariants(&result, &pool);

        let order: Vec<SeverityLabel> = result.records.iter().map(|r| r.severity).collect();
        assert_eq!(order, vec![SeverityLabel::High, SeverityLabel::Medium, SeverityLabel::Low]);

        for record in &result.records {
            assert_eq!(record.unmet.get(ResourceKind::FoodKits), 0);
            assert_eq!(record.unmet.get(ResourceKind::WaterPacks), 0);
        }

        let high = result.record_for(1).unwrap();
        assert_eq!(high.allocated.get(ResourceKind::ShelterUnits), 2812);

        let medium = result.record_for(2).unwrap();
        assert_eq!(medium.allocated.get(ResourceKind::ShelterUnits), 11);

        let low = result.record_for(0).unwrap();
        assert_eq!(low.need.get(ResourceKind::ShelterUnits), 200);
        assert_eq!(low.allocated.get(ResourceKind::ShelterUnits), 1);
        assert!(low.fulfillment_rate > 0.0 && low.fulfillment_rate < 1.0);

        assert_eq!(result.summary.remaining.get(ResourceKind::ShelterUnits), 176);
        assert_eq!(result.summary.total_need.get(ResourceKind::ShelterUnits), 3792);
    }

    #[test]
    fn test_scenario_d_empty_kind() {
        let allocator = ResourceAllocator::new();
        let pool = pool(0, 1_000_000, 1_000_000, 1_000_000);
        let result = allocator
            .allocate(&[DisasterReport::new(SeverityLabel::High, 3000, "cyclone")], &pool)
            .unwrap();
        let record = &result.records[0];
        assert_eq!(record.allocated.get(ResourceKind::FoodKits), 0);
        assert_eq!(record.unmet.get(ResourceKind::FoodKits), record.need.get(ResourceKind::FoodKits));
        assert_eq!(result.summary.utilization[&ResourceKind::FoodKits], 0.0);
    }

    #[test]
    fn test_scenario_e_ample_pool() {
        let allocator = ResourceAllocator::new();
        let record = allocator
            .allocate_single(
                SeverityLabel::Medium,
                2500,
                "landslide",
                &pool(1_000_000, 1_000_000, 1_000_000, 1_000_000),
            )
            .unwrap();
        assert_eq!(record.fulfillment_rate, 1.0);
        assert_eq!(record.unmet.total(), 0);
    }

    #[test]
    fn test_need_equal_to_remaining_uses_full_allocation() {
        let allocator = ResourceAllocator::new();
        let need = allocator
            .estimator()
            .estimate(SeverityLabel::Low, &DisasterType::Drought, 800);
        let exact = ResourcePool::from(&need);
        let result = allocator
            .allocate(&[DisasterReport::new(SeverityLabel::Low, 800, "drought")], &exact)
            .unwrap();
        assert_eq!(result.records[0].allocated, need);
        assert_eq!(result.records[0].fulfillment_rate, 1.0);
        assert_eq!(result.summary.remaining.total(), 0);
        assert!(result.summary.utilization.values().all(|u| *u == 1.0));
    }

    #[test]
    fn test_zero_people_is_vacuously_fulfilled() {
        let allocator = ResourceAllocator::new();
        let result = allocator
            .allocate(&[DisasterReport::new(SeverityLabel::High, 0, "flood")], &pool(0, 0, 0, 0))
            .unwrap();
        assert_eq!(result.records[0].need.total(), 0);
        assert_eq!(result.records[0].fulfillment_rate, 1.0);
        assert_eq!(result.fulfillment_rate(), 1.0);
    }

    #[test]
    fn test_fair_share_is_capped() {
        let allocator = ResourceAllocator::new();
        assert_eq!(allocator.fair_share(SeverityLabel::High, 10, 0, 100), 0);
        assert_eq!(allocator.fair_share(SeverityLabel::High, 100, 100, 50), 25);
        assert_eq!(allocator.fair_share(SeverityLabel::Low, 100, 100, 0), 0);
    }

    #[test]
    fn test_negative_pool_rejected() {
        let allocator = ResourceAllocator::new();
        let err = allocator
            .allocate(&scenario_a(), &pool(10, -1, 10, 10))
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InvalidPool { kind: ResourceKind::WaterPacks, quantity: -1 }
        ));
    }

    #[test]
    fn test_empty_list_returns_empty_result() {
        let allocator = ResourceAllocator::new();
        let pool = pool(5, 5, 5, 5);
        let result = allocator.allocate(&[], &pool).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.summary.total_disasters, 0);
        assert_eq!(result.summary.remaining, pool.validate().unwrap());
        assert!(result.summary.average_fulfillment.is_empty());
    }

    #[test]
    fn test_priority_orders_by_severity_then_population() {
        let allocator = ResourceAllocator::new();
        assert!(allocator.priority_score(SeverityLabel::High, 1) > allocator.priority_score(SeverityLabel::Medium, 10_000_000));
        assert!(allocator.priority_score(SeverityLabel::Low, 1000) > allocator.priority_score(SeverityLabel::Low, 999));
        assert_eq!(allocator.priority_score(SeverityLabel::Low, 0), 100.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let allocator = ResourceAllocator::new();
        let disasters: Vec<DisasterReport> = (0..4)
            .map(|i| DisasterReport::new(SeverityLabel::Medium, 1000, "flood").with_location(format!("site-{}", i)))
            .collect();
        let result = allocator.allocate(&disasters, &pool(100, 100, 100, 100)).unwrap();
        let indices: Vec<usize> = result.records.iter().map(|r| r.disaster_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_invariants(&result, &pool(100, 100, 100, 100));
    }

    #[test]
    fn test_higher_priority_served_first_under_scarcity() {
        let allocator = ResourceAllocator::new();
        let disasters = vec![
            DisasterReport::new(SeverityLabel::Low, 1000, "flood"),
            DisasterReport::new(SeverityLabel::High, 1000, "flood"),
        ];
        let pool = pool(1500, 0, 0, 0);
        let result = allocator.allocate(&disasters, &pool).unwrap();
        assert_invariants(&result, &pool);

        let high = result.record_for(1).unwrap();
        let low = result.record_for(0).unwrap();
        assert_eq!(high.allocated.get(ResourceKind::FoodKits), 1200);
        assert!(low.allocated.get(ResourceKind::FoodKits) < low.need.get(ResourceKind::FoodKits));
        assert!(high.fulfillment_rate >= low.fulfillment_rate);
    }

    fn high_and_low_floods() -> Vec<DisasterReport> {
        vec![
            DisasterReport::new(SeverityLabel::Low, 1000, "flood"),
            DisasterReport::new(SeverityLabel::High, 1000, "flood"),
        ]
    }

    #[test]
    fn test_high_fulfilled_at_least_as_much_as_low_when_both_ration() {
        let allocator = ResourceAllocator::new();
        // Food is short for both: High gets floor(700 * 0.6 * 0.5) = 210,
        // leaving 490 < 800 so Low rations too: floor(490 * 0.4 * 0.2) = 39
        let pool = pool(700, 10_000, 10_000, 10_000);
        let result = allocator.allocate(&high_and_low_floods(), &pool).unwrap();
        assert_invariants(&result, &pool);

        let high = result.record_for(1).unwrap();
        let low = result.record_for(0).unwrap();
        assert_eq!(high.allocated.get(ResourceKind::FoodKits), 210);
        assert_eq!(low.allocated.get(ResourceKind::FoodKits), 39);
        assert_eq!(high.allocated.total(), 3352);
        assert_eq!(low.allocated.total(), 2134);
        assert!(high.fulfillment_rate >= low.fulfillment_rate);
    }

    #[test]
    fn test_low_can_outpace_high_when_remainder_covers_its_need() {
        let allocator = ResourceAllocator::new();
        // High rations food to floor(1150 * 0.6 * 0.5) = 345. The 805 left
        // covers Low's 800, and the full-need path always wins.
        let pool = pool(1150, 10_000, 10_000, 10_000);
        let result = allocator.allocate(&high_and_low_floods(), &pool).unwrap();
        assert_invariants(&result, &pool);

        let high = result.record_for(1).unwrap();
        let low = result.record_for(0).unwrap();
        assert_eq!(result.records[0].disaster_index, 1);
        assert_eq!(high.need.total(), 4342);
        assert_eq!(high.allocated.get(ResourceKind::FoodKits), 345);
        assert_eq!(high.allocated.total(), 3487);
        assert_eq!(low.allocated, low.need);
        assert_eq!(low.fulfillment_rate, 1.0);
        assert!(high.fulfillment_rate < low.fulfillment_rate);
        assert_eq!(result.summary.remaining.get(ResourceKind::FoodKits), 5);
    }

    #[test]
    fn test_average_fulfillment_only_reports_present_bands() {
        let allocator = ResourceAllocator::new();
        let result = allocator
            .allocate(&[DisasterReport::new(SeverityLabel::Low, 10, "fire")], &pool(100, 100, 100, 100))
            .unwrap();
        let bands: Vec<SeverityLabel> = result.summary.average_fulfillment.keys().copied().collect();
        assert_eq!(bands, vec![SeverityLabel::Low]);
    }

    #[test]
    fn test_caller_pool_untouched() {
        let allocator = ResourceAllocator::new();
        let pool = pool(10, 10, 10, 10);
        let before = pool.clone();
        allocator.allocate(&scenario_a(), &pool).unwrap();
        assert_eq!(pool, before);
    }
}
