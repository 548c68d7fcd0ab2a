//! Shared resource stock drawn down by successive allocation passes

use super::allocator::{AllocationResult, ResourceAllocator};
use crate::error::AllocationError;
use crate::models::{DisasterReport, ResourceKind, ResourcePool, ResourceVector};
use crate::observability::ReliefMetrics;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::info;

/// Largest quantity a kind can hold, since allocation passes read the stock as a signed pool
const MAX_STOCK: u64 = i64::MAX as u64;

/// Owns a resource stock and serializes allocation passes against it.
///
/// Each pass holds the lock from reading the stock until the depleted stock
/// is committed, so concurrent callers never double-spend.
pub struct PoolLedger {
    stock: Mutex<ResourceVector>,
    allocator: ResourceAllocator,
    metrics: ReliefMetrics,
}

impl PoolLedger {
    pub fn new(pool: &ResourcePool, allocator: ResourceAllocator) -> Result<Self, AllocationError> {
        Ok(Self {
            stock: Mutex::new(pool.validate()?),
            allocator,
            metrics: ReliefMetrics::new(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ResourceVector>, AllocationError> {
        self.stock.lock().map_err(|_| AllocationError::LedgerPoisoned)
    }

    /// Run one pass against the current stock and commit what remains
    pub fn allocate(&self, disasters: &[DisasterReport]) -> Result<AllocationResult, AllocationError> {
        let mut stock = self.lock()?;
        let start = Instant::now();

        let result = self
            .allocator
            .allocate(disasters, &ResourcePool::from(&*stock))?;
        *stock = result.summary.remaining.clone();

        self.metrics
            .observe_allocation(&result, start.elapsed().as_secs_f64());
        Ok(result)
    }

    /// Add units to the stock.
    ///
    /// Every kind must stay representable as a pool quantity, otherwise the
    /// whole delivery is rejected and the stock is left untouched.
    pub fn restock(&self, delivery: &ResourceVector) -> Result<ResourceVector, AllocationError> {
        let mut stock = self.lock()?;
        let mut restocked = stock.clone();
        for (kind, delivered) in delivery.iter() {
            let current = restocked.get(kind);
            let total = current
                .checked_add(delivered)
                .filter(|total| *total <= MAX_STOCK)
                .ok_or(AllocationError::StockOverflow {
                    kind,
                    stock: current,
                    delivered,
                })?;
            restocked.set(kind, total);
        }
        *stock = restocked;
        info!(
            delivered = delivery.total(),
            stock_total = stock.total(),
            "Pool restocked"
        );
        Ok(stock.clone())
    }

    pub fn snapshot(&self) -> Result<ResourceVector, AllocationError> {
        Ok(self.lock()?.clone())
    }

    pub fn available(&self, kind: ResourceKind) -> Result<u64, AllocationError> {
        Ok(self.lock()?.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeverityLabel;
    use std::sync::Arc;

    fn ledger(food: i64) -> PoolLedger {
        let pool = ResourcePool::new()
            .with(ResourceKind::FoodKits, food)
            .with(ResourceKind::WaterPacks, 100_000)
            .with(ResourceKind::MedicineKits, 100_000)
            .with(ResourceKind::ShelterUnits, 100_000);
        PoolLedger::new(&pool, ResourceAllocator::new()).unwrap()
    }

    #[test]
    fn test_passes_draw_down_shared_stock() {
        let ledger = ledger(1000);
        let report = DisasterReport::new(SeverityLabel::Low, 1000, "flood");

        let first = ledger.allocate(std::slice::from_ref(&report)).unwrap();
        assert_eq!(first.records[0].allocated.get(ResourceKind::FoodKits), 800);
        assert_eq!(ledger.available(ResourceKind::FoodKits).unwrap(), 200);

        let second = ledger.allocate(std::slice::from_ref(&report)).unwrap();
        assert!(second.records[0].allocated.get(ResourceKind::FoodKits) < 800);
        assert_eq!(
            ledger.available(ResourceKind::FoodKits).unwrap(),
            200 - second.records[0].allocated.get(ResourceKind::FoodKits)
        );
    }

    #[test]
    fn test_restock_adds_to_stock() {
        let ledger = ledger(10);
        let stock = ledger
            .restock(&ResourceVector::new().with(ResourceKind::FoodKits, 90))
            .unwrap();
        assert_eq!(stock.get(ResourceKind::FoodKits), 100);
        assert_eq!(ledger.snapshot().unwrap(), stock);
    }

    #[test]
    fn test_restock_rejects_quantities_past_pool_range() {
        let ledger = ledger(10);
        let before = ledger.snapshot().unwrap();
        let delivery = ResourceVector::new()
            .with(ResourceKind::WaterPacks, 5)
            .with(ResourceKind::FoodKits, i64::MAX as u64);

        let err = ledger.restock(&delivery).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::StockOverflow {
                kind: ResourceKind::FoodKits,
                stock: 10,
                ..
            }
        ));
        assert_eq!(ledger.snapshot().unwrap(), before);

        let stock = ledger
            .restock(&ResourceVector::new().with(ResourceKind::FoodKits, i64::MAX as u64 - 10))
            .unwrap();
        assert_eq!(stock.get(ResourceKind::FoodKits), i64::MAX as u64);
        let pool = ResourcePool::from(&stock);
        assert_eq!(pool.get(ResourceKind::FoodKits), i64::MAX);
    }

    #[test]
    fn test_invalid_initial_pool() {
        let pool = ResourcePool::new().with(ResourceKind::ShelterUnits, -5);
        assert!(matches!(
            PoolLedger::new(&pool, ResourceAllocator::new()),
            Err(AllocationError::InvalidPool { .. })
        ));
    }

    #[test]
    fn test_concurrent_passes_never_overspend() {
        let ledger = Arc::new(ledger(5000));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    let report = DisasterReport::new(SeverityLabel::Medium, 500 + i * 100, "drought");
                    ledger.allocate(&[report]).unwrap()
                })
            })
            .collect();

        let granted: u64 = handles
            .into_iter()
            .map(|h| h.join().unwrap().records[0].allocated.get(ResourceKind::FoodKits))
            .sum();
        assert_eq!(granted + ledger.available(ResourceKind::FoodKits).unwrap(), 5000);
    }
}
