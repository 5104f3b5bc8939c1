use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::model::{RingState, WindowBucket, WindowRing};

/// Per-tick counters from one drain/aggregate/advance pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries removed from the counter table.
    pub drained: usize,
    /// Keys that were enumerated but failed to drain.
    pub skipped: usize,
    pub enumerate_failed: bool,
    /// Distinct records in the tick's bucket.
    pub records: usize,
    /// Records in the bucket that fell out of the window, if any.
    pub evicted: Option<usize>,
}

/// Immutable copy of the rolling total plus ring metadata, published
/// after every tick.
#[derive(Clone, Debug)]
pub struct WindowSnapshot {
    total: WindowBucket,
    pub state: RingState,
    pub buckets: usize,
    pub capacity: usize,
    pub interval: Duration,
    pub ticks: u64,
    pub last_tick: TickReport,
}

impl WindowSnapshot {
    pub fn empty(capacity: usize, interval: Duration) -> Self {
        Self {
            total: WindowBucket::new(),
            state: RingState::Empty,
            buckets: 0,
            capacity,
            interval,
            ticks: 0,
            last_tick: TickReport::default(),
        }
    }

    pub fn capture(ring: &WindowRing, interval: Duration, ticks: u64, last_tick: TickReport) -> Self {
        Self {
            total: ring.total().clone(),
            state: ring.state(),
            buckets: ring.len(),
            capacity: ring.capacity(),
            interval,
            ticks,
            last_tick,
        }
    }

    /// Rolling total over the window.
    pub fn total(&self) -> &WindowBucket {
        &self.total
    }

    /// Time span the window covers once full.
    pub fn horizon(&self) -> Duration {
        self.interval.saturating_mul(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }

    /// Time span actually covered so far.
    pub fn covered(&self) -> Duration {
        self.interval.saturating_mul(u32::try_from(self.buckets).unwrap_or(u32::MAX))
    }
}

/// Shared window type: the aggregation thread stores, readers load.
pub type SharedWindow = Arc<ArcSwap<WindowSnapshot>>;

/// Create a shared window holding an empty snapshot.
pub fn new_shared_window(capacity: usize, interval: Duration) -> SharedWindow {
    Arc::new(ArcSwap::from_pointee(WindowSnapshot::empty(capacity, interval)))
}
