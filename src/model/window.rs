use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::model::WindowBucket;

/// Fill state of a [`WindowRing`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingState {
    Empty,
    Filling,
    Full,
}

/// Fixed-capacity ring of per-tick buckets with an incrementally
/// maintained rolling total.
///
/// The total is updated on every [`advance`](Self::advance): the new
/// bucket is added, and once the ring is full the evicted bucket is
/// subtracted. [`total`](Self::total) never sums the buckets.
#[derive(Clone, Debug)]
pub struct WindowRing {
    buckets: VecDeque<WindowBucket>,
    capacity: NonZeroUsize,
    total: WindowBucket,
}

impl WindowRing {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buckets: VecDeque::with_capacity(capacity.get()),
            capacity,
            total: WindowBucket::new(),
        }
    }

    /// Push the bucket for the tick that just ended. Returns the bucket
    /// evicted to make room, if the ring was already full.
    pub fn advance(&mut self, bucket: WindowBucket) -> Option<WindowBucket> {
        let evicted = if self.buckets.len() == self.capacity.get() {
            let oldest = self.buckets.pop_front();
            if let Some(ref old) = oldest {
                self.total.subtract(old);
            }
            oldest
        } else {
            None
        };

        self.total.merge(&bucket);
        self.buckets.push_back(bucket);
        evicted
    }

    /// Rolling total over the buckets currently held.
    pub fn total(&self) -> &WindowBucket {
        &self.total
    }

    pub fn state(&self) -> RingState {
        match self.buckets.len() {
            0 => RingState::Empty,
            n if n < self.capacity.get() => RingState::Filling,
            _ => RingState::Full,
        }
    }

    /// Most recently pushed bucket.
    pub fn latest(&self) -> Option<&WindowBucket> {
        self.buckets.back()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &WindowBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Trailing time span the ring covers once full.
    pub fn horizon(&self, interval: Duration) -> Duration {
        interval.saturating_mul(u32::try_from(self.capacity.get()).unwrap_or(u32::MAX))
    }

    /// Trailing time span the ring covers right now.
    pub fn covered(&self, interval: Duration) -> Duration {
        interval.saturating_mul(u32::try_from(self.buckets.len()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CounterEntry, CounterKey, FileMetrics, aggregate};
    use std::net::Ipv4Addr;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn writes(uid: u32, inode: u64, w_ops: u64) -> WindowBucket {
        let e = CounterEntry::new(
            CounterKey::new(uid, inode, Ipv4Addr::new(10, 0, 0, 5)),
            FileMetrics::new(0, 0, w_ops, w_ops * 512),
        );
        aggregate([&e])
    }

    #[test]
    fn test_new_ring_is_empty() {
        let ring = WindowRing::new(cap(3));
        assert_eq!(ring.state(), RingState::Empty);
        assert!(ring.is_empty());
        assert!(ring.total().is_empty());
        assert_eq!(ring.total().totals(), FileMetrics::default());
    }

    #[test]
    fn test_filling_total_reflects_existing_buckets_only() {
        let mut ring = WindowRing::new(cap(5));
        assert!(ring.advance(writes(1, 1, 2)).is_none());
        assert!(ring.advance(writes(1, 1, 3)).is_none());
        assert_eq!(ring.state(), RingState::Filling);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.total().totals().write_ops, 5);
    }

    #[test]
    fn test_eviction_boundary() {
        let mut ring = WindowRing::new(cap(3));
        ring.advance(writes(1, 1, 1));
        ring.advance(writes(1, 2, 1));
        ring.advance(writes(1, 3, 1));
        assert_eq!(ring.state(), RingState::Full);
        assert_eq!(ring.total().totals().write_ops, 3);

        let evicted = ring.advance(writes(1, 4, 1)).unwrap();
        assert_eq!(evicted.totals().write_ops, 1);
        assert_eq!(ring.state(), RingState::Full);
        assert_eq!(ring.total().totals().write_ops, 3);
        // B1 touched inode 1 only; it must be gone from the total.
        assert!(ring.total().user_file(1, 1, Ipv4Addr::new(10, 0, 0, 5)).is_none());
        assert!(ring.total().user_file(1, 4, Ipv4Addr::new(10, 0, 0, 5)).is_some());
    }

    #[test]
    fn test_eviction_keeps_overlapping_record() {
        let mut ring = WindowRing::new(cap(2));
        ring.advance(writes(1, 1, 4));
        ring.advance(writes(1, 1, 6));
        ring.advance(writes(1, 1, 1));
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let m = ring.total().user_file(1, 1, ip).copied().unwrap();
        assert_eq!(m.write_ops, 7);
        assert_eq!(m.write_bytes, 7 * 512);
        assert_eq!(ring.total().user(1).unwrap().usage(), 7 * 512);
        assert_eq!(ring.total().ip(ip).unwrap().usage(), 7 * 512);
    }

    #[test]
    fn test_capacity_one_keeps_latest_only() {
        let mut ring = WindowRing::new(cap(1));
        ring.advance(writes(1, 1, 9));
        ring.advance(writes(2, 2, 1));
        assert_eq!(ring.len(), 1);
        assert!(ring.total().user(1).is_none());
        assert_eq!(ring.total().totals().write_ops, 1);
    }

    #[test]
    fn test_empty_buckets_advance_and_evict() {
        let mut ring = WindowRing::new(cap(2));
        ring.advance(writes(1, 1, 1));
        ring.advance(WindowBucket::new());
        ring.advance(WindowBucket::new());
        assert!(ring.total().is_empty());
        assert_eq!(ring.state(), RingState::Full);
    }

    #[test]
    fn test_iter_oldest_to_newest() {
        let mut ring = WindowRing::new(cap(3));
        for ops in 1..=4 {
            ring.advance(writes(1, 1, ops));
        }
        let ops: Vec<u64> = ring.iter().map(|b| b.totals().write_ops).collect();
        assert_eq!(ops, vec![2, 3, 4]);
        assert_eq!(ring.latest().unwrap().totals().write_ops, 4);
    }

    #[test]
    fn test_horizon() {
        let mut ring = WindowRing::new(cap(900));
        assert_eq!(ring.horizon(Duration::from_secs(1)), Duration::from_secs(900));
        ring.advance(WindowBucket::new());
        assert_eq!(ring.covered(Duration::from_millis(500)), Duration::from_millis(500));
    }
}
