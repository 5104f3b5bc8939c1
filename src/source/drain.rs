use crate::model::CounterEntry;
use crate::source::CounterSource;

/// Result of one drain pass.
#[derive(Debug, Default)]
pub struct Drained {
    pub entries: Vec<CounterEntry>,
    /// Keys that were enumerated but could not be read and removed.
    pub skipped: usize,
    /// Key enumeration failed; `entries` is empty.
    pub enumerate_failed: bool,
}

/// Extract and clear every entry present in `source`.
///
/// Keys are snapshotted first, then each one is read and removed. A key
/// that fails (typically because it vanished in between) is logged and
/// skipped. Entries created after the snapshot are left for the next
/// pass. Never fails: an enumeration error yields an empty pass.
pub fn drain<S: CounterSource + ?Sized>(source: &mut S) -> Drained {
    let keys = match source.keys() {
        Ok(keys) => keys,
        Err(e) => {
            log::warn!("counter table enumeration failed: {e}");
            return Drained {
                enumerate_failed: true,
                ..Drained::default()
            };
        }
    };

    let mut drained = Drained {
        entries: Vec::with_capacity(keys.len()),
        ..Drained::default()
    };
    for key in keys {
        match source.take(&key) {
            Ok(counts) => drained.entries.push(CounterEntry::new(key, counts)),
            Err(e) => {
                log::warn!("drain {key}: {e}");
                drained.skipped += 1;
            }
        }
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::model::{CounterKey, FileMetrics};
    use crate::source::{MemoryCounterSource, SourceError};
    use std::net::Ipv4Addr;

    fn key(uid: u32, inode: u64) -> CounterKey {
        CounterKey::new(uid, inode, Ipv4Addr::new(10, 0, 0, 1))
    }

    /// Source whose keys vanish or whose enumeration fails on demand.
    struct Flaky {
        inner: MemoryCounterSource,
        vanish: Vec<CounterKey>,
        broken: bool,
    }

    impl CounterSource for Flaky {
        fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError> {
            if self.broken {
                return Err(ViewerError::CounterSource("EPERM".into()));
            }
            self.inner.keys()
        }

        fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError> {
            if self.vanish.contains(key) {
                self.inner.take(key)?;
                return Err(ViewerError::CounterSource(format!("{key} vanished")));
            }
            self.inner.take(key)
        }
    }

    #[test]
    fn ut_drain_empties_source() {
        let mut src = MemoryCounterSource::new();
        src.write(key(1, 1), 10);
        src.read(key(2, 2), 20);
        let drained = drain(&mut src);
        assert_eq!(drained.entries.len(), 2);
        assert_eq!(drained.skipped, 0);
        assert!(src.is_empty());
        assert!(drain(&mut src).entries.is_empty());
    }

    #[test]
    fn ut_drain_skips_failed_key() {
        let inner = MemoryCounterSource::new();
        inner.write(key(1, 1), 10);
        inner.write(key(1, 2), 10);
        inner.write(key(1, 3), 10);
        let mut src = Flaky {
            inner,
            vanish: vec![key(1, 2)],
            broken: false,
        };
        let drained = drain(&mut src);
        assert_eq!(drained.entries.len(), 2);
        assert_eq!(drained.skipped, 1);
        assert!(drained.entries.iter().all(|e| e.key != key(1, 2)));
    }

    #[test]
    fn ut_drain_enumeration_failure_is_empty_pass() {
        let inner = MemoryCounterSource::new();
        inner.write(key(1, 1), 10);
        let mut src = Flaky {
            inner: inner.clone(),
            vanish: Vec::new(),
            broken: true,
        };
        let drained = drain(&mut src);
        assert!(drained.entries.is_empty());
        assert!(drained.enumerate_failed);
        // Nothing was removed; the next healthy pass picks it up.
        assert_eq!(inner.len(), 1);
    }
}
