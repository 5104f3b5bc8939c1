//! The aggregation loop: drain, aggregate, advance, publish.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::select;

use crate::model::{WindowRing, aggregate};
use crate::source::{CounterSource, drain};
use crate::state::{SharedWindow, TickReport, WindowSnapshot, new_shared_window};

/// Shutdown is checked at least this often while waiting for a tick.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Owns the counter source and the window ring.
///
/// Only the thread running [`tick`](Self::tick) touches the ring; everyone
/// else reads the [`WindowSnapshot`] published after each tick.
pub struct Aggregator<S> {
    source: S,
    ring: WindowRing,
    interval: Duration,
    ticks: u64,
    shared: SharedWindow,
}

impl<S: CounterSource> Aggregator<S> {
    pub fn new(source: S, capacity: NonZeroUsize, interval: Duration) -> Self {
        Self {
            source,
            ring: WindowRing::new(capacity),
            interval,
            ticks: 0,
            shared: new_shared_window(capacity.get(), interval),
        }
    }

    /// Handle readers use to load the latest snapshot.
    pub fn shared(&self) -> SharedWindow {
        Arc::clone(&self.shared)
    }

    pub fn ring(&self) -> &WindowRing {
        &self.ring
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick synchronously.
    pub fn tick(&mut self) -> TickReport {
        let drained = drain(&mut self.source);
        let bucket = aggregate(&drained.entries);
        let records = bucket.len();
        let evicted = self.ring.advance(bucket).map(|b| b.len());
        self.ticks += 1;

        let report = TickReport {
            drained: drained.entries.len(),
            skipped: drained.skipped,
            enumerate_failed: drained.enumerate_failed,
            records,
            evicted,
        };
        log::debug!(
            "tick {}: drained={} skipped={} records={} evicted={:?} window={}/{} total_records={}",
            self.ticks,
            report.drained,
            report.skipped,
            report.records,
            report.evicted,
            self.ring.len(),
            self.ring.capacity(),
            self.ring.total().len()
        );

        self.shared.store(Arc::new(WindowSnapshot::capture(
            &self.ring,
            self.interval,
            self.ticks,
            report,
        )));
        report
    }
}

/// Tick `agg` every `interval` until `shutdown` is set.
///
/// The flag is checked between ticks, so the loop exits at the next
/// tick boundary. Returns the aggregator so callers can inspect it.
pub fn run_aggregation_loop<S: CounterSource>(
    mut agg: Aggregator<S>,
    shutdown: &AtomicBool,
) -> Aggregator<S> {
    let ticker = crossbeam_channel::tick(agg.interval);
    let poll = agg.interval.min(SHUTDOWN_POLL);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        select! {
            recv(ticker) -> _ => {
                agg.tick();
            },
            default(poll) => {},
        }
    }

    log::info!(
        "aggregation loop exit: ticks={}, window={}/{}, total_records={}",
        agg.ticks,
        agg.ring.len(),
        agg.ring.capacity(),
        agg.ring.total().len()
    );
    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CounterKey, RingState};
    use crate::source::MemoryCounterSource;
    use std::net::Ipv4Addr;
    use std::thread;

    fn agg(cap: usize) -> (MemoryCounterSource, Aggregator<MemoryCounterSource>) {
        let src = MemoryCounterSource::new();
        let agg = Aggregator::new(src.clone(), NonZeroUsize::new(cap).unwrap(), Duration::from_millis(10));
        (src, agg)
    }

    #[test]
    fn tick_publishes_snapshot() {
        let (src, mut agg) = agg(3);
        let shared = agg.shared();
        let key = CounterKey::new(1000, 42, Ipv4Addr::new(10, 0, 0, 5));
        src.write(key, 4096);

        let report = agg.tick();
        assert_eq!(report.drained, 1);
        assert_eq!(report.records, 1);
        assert_eq!(report.evicted, None);

        let snap = shared.load();
        assert_eq!(snap.ticks, 1);
        assert_eq!(snap.state, RingState::Filling);
        assert_eq!(snap.total().user(1000).unwrap().usage(), 4096);
    }

    #[test]
    fn empty_tick_still_advances() {
        let (_src, mut agg) = agg(2);
        agg.tick();
        agg.tick();
        let report = agg.tick();
        assert_eq!(report.drained, 0);
        assert_eq!(report.evicted, Some(0));
        assert_eq!(agg.ring().state(), RingState::Full);
    }

    #[test]
    fn loop_stops_on_shutdown() {
        let (src, agg) = agg(1000);
        let shutdown = AtomicBool::new(false);
        src.read(CounterKey::new(1, 1, Ipv4Addr::new(10, 0, 0, 1)), 10);

        let agg = thread::scope(|s| {
            let h = s.spawn(|| run_aggregation_loop(agg, &shutdown));
            thread::sleep(Duration::from_millis(80));
            shutdown.store(true, Ordering::Relaxed);
            h.join().unwrap()
        });
        assert!(agg.ticks() >= 1);
        assert!(src.is_empty());
        assert_eq!(agg.ring().total().totals().read_bytes, 10);
    }
}
