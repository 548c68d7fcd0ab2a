//! Need estimation and multi-disaster resource allocation

mod allocator;
mod ledger;
mod need;

pub use allocator::{
    AllocationPolicy, AllocationRecord, AllocationResult, AllocationSummary, ResourceAllocator,
};
pub use ledger::PoolLedger;
pub use need::{NeedEstimator, NeedPolicy};
