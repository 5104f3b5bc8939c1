use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::error::ViewerError;
use crate::model::{CounterKey, FileMetrics};
use crate::source::{CounterSource, SourceError};

/// In-process counter table.
///
/// Clones share the same table, so one clone can be handed to writer
/// threads (standing in for the kernel probes) while another is drained.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterSource {
    table: Arc<Mutex<FxHashMap<CounterKey, FileMetrics>>>,
}

impl MemoryCounterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `counts` to the entry for `key`, creating it if absent.
    pub fn record(&self, key: CounterKey, counts: FileMetrics) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        *table.entry(key).or_default() += &counts;
    }

    /// Count one read of `bytes` bytes.
    pub fn read(&self, key: CounterKey, bytes: u64) {
        self.record(key, FileMetrics::new(1, bytes, 0, 0));
    }

    /// Count one write of `bytes` bytes.
    pub fn write(&self, key: CounterKey, bytes: u64) {
        self.record(key, FileMetrics::new(0, 0, 1, bytes));
    }

    pub fn get(&self, key: &CounterKey) -> Option<FileMetrics> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CounterSource for MemoryCounterSource {
    fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.keys().copied().collect())
    }

    fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .remove(key)
            .ok_or_else(|| ViewerError::CounterSource(format!("no entry for {key}")))
    }
}
