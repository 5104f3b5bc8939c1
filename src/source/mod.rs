//! Counter table access.
//!
//! The kernel collector keeps one counter entry per (uid, inode, client)
//! and increments it in place. [`CounterSource`] is the userspace view of
//! that table; [`drain`] empties it once per tick.

mod drain;
mod memory;

pub use drain::{Drained, drain};
pub use memory::MemoryCounterSource;

use crate::error::ViewerError;
use crate::model::{CounterKey, FileMetrics};

pub type SourceError = ViewerError;

/// A keyed table of cumulative read/write counters.
pub trait CounterSource {
    /// Enumerate the keys present right now.
    fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError>;

    /// Read the counters for `key` and remove the entry.
    fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError>;
}

impl<S: CounterSource + ?Sized> CounterSource for Box<S> {
    fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError> {
        (**self).keys()
    }

    fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError> {
        (**self).take(key)
    }
}

impl<S: CounterSource + ?Sized> CounterSource for &mut S {
    fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError> {
        (**self).keys()
    }

    fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError> {
        (**self).take(key)
    }
}
