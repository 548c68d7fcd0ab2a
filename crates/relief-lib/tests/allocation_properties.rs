//! Allocation invariants over a spread of generated passes

use relief_lib::{
    DisasterReport, DisasterType, ResourceAllocator, ResourceKind, ResourcePool, SeverityLabel,
};

/// Small deterministic generator so runs are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn generate_pass(rng: &mut Lcg) -> (Vec<DisasterReport>, ResourcePool) {
    let count = 1 + rng.below(8) as usize;
    let disasters = (0..count)
        .map(|i| {
            let severity = SeverityLabel::ALL[rng.below(3) as usize];
            let kind = DisasterType::KNOWN[rng.below(DisasterType::KNOWN.len() as u64) as usize].clone();
            DisasterReport::new(severity, rng.below(50_000), kind).with_location(format!("site-{}", i))
        })
        .collect();
    let pool = ResourceKind::ALL
        .iter()
        .fold(ResourcePool::new(), |pool, kind| pool.with(*kind, rng.below(40_000) as i64));
    (disasters, pool)
}

#[test]
fn conservation_and_no_over_allocation() {
    let allocator = ResourceAllocator::new();
    let mut rng = Lcg(7);

    for _ in 0..200 {
        let (disasters, pool) = generate_pass(&mut rng);
        let result = allocator.allocate(&disasters, &pool).unwrap();
        assert_eq!(result.records.len(), disasters.len());

        for kind in ResourceKind::ALL {
            let available = pool.get(kind) as u64;
            let handed_out: u64 = result.records.iter().map(|r| r.allocated.get(kind)).sum();
            assert!(handed_out <= available);
            assert_eq!(result.summary.remaining.get(kind), available - handed_out);

            let utilization = result.summary.utilization[&kind];
            assert!((0.0..=1.0).contains(&utilization));
        }

        for record in &result.records {
            for kind in ResourceKind::ALL {
                assert!(record.allocated.get(kind) <= record.need.get(kind));
                assert_eq!(
                    record.unmet.get(kind),
                    record.need.get(kind) - record.allocated.get(kind)
                );
            }
            assert!((0.0..=1.0).contains(&record.fulfillment_rate));
        }
    }
}

#[test]
fn records_follow_priority_order() {
    let allocator = ResourceAllocator::new();
    let mut rng = Lcg(42);

    for _ in 0..200 {
        let (disasters, pool) = generate_pass(&mut rng);
        let result = allocator.allocate(&disasters, &pool).unwrap();

        for pair in result.records.windows(2) {
            assert!(pair[0].priority_score >= pair[1].priority_score);
            if pair[0].priority_score == pair[1].priority_score {
                assert!(pair[0].disaster_index < pair[1].disaster_index);
            }
            assert!(pair[0].severity >= pair[1].severity);
        }
    }
}

#[test]
fn full_need_granted_while_stock_lasts() {
    let allocator = ResourceAllocator::new();
    let mut rng = Lcg(1234);

    for _ in 0..200 {
        let (disasters, pool) = generate_pass(&mut rng);
        let result = allocator.allocate(&disasters, &pool).unwrap();

        for kind in ResourceKind::ALL {
            let mut remaining = pool.get(kind) as u64;
            for record in &result.records {
                let need = record.need.get(kind);
                if need <= remaining {
                    assert_eq!(record.allocated.get(kind), need);
                }
                remaining -= record.allocated.get(kind);
            }
        }
    }
}

#[test]
fn identical_inputs_give_identical_results() {
    let allocator = ResourceAllocator::new();
    let (disasters, pool) = generate_pass(&mut Lcg(99));
    let first = allocator.allocate(&disasters, &pool).unwrap();
    let second = allocator.allocate(&disasters, &pool).unwrap();
    assert_eq!(first.records, second.records);
}
