pub mod bucket;
pub mod window;

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::{AddAssign, SubAssign};

use serde::Serialize;

pub use bucket::{FileId, InodePeer, InodeUser, IpMetrics, UserMetrics, WindowBucket, aggregate};
pub use window::{RingState, WindowRing};

/// Key of one counter table entry: who touched which file from where.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    pub uid: u32,
    pub inode: u64,
    pub remote: Ipv4Addr,
}

impl CounterKey {
    pub fn new(uid: u32, inode: u64, remote: impl Into<Ipv4Addr>) -> Self {
        Self {
            uid,
            inode,
            remote: remote.into(),
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid={} ino={} ip={}", self.uid, self.inode, self.remote)
    }
}

/// Cumulative read/write counters for one (uid, inode, remote) triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FileMetrics {
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
}

impl FileMetrics {
    pub const fn new(read_ops: u64, read_bytes: u64, write_ops: u64, write_bytes: u64) -> Self {
        Self {
            read_ops,
            read_bytes,
            write_ops,
            write_bytes,
        }
    }

    /// Bytes moved in either direction. This is the "usage" figure the
    /// per-user and per-client indices aggregate.
    pub fn io_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign<&FileMetrics> for FileMetrics {
    fn add_assign(&mut self, rhs: &FileMetrics) {
        self.read_ops = self.read_ops.saturating_add(rhs.read_ops);
        self.read_bytes = self.read_bytes.saturating_add(rhs.read_bytes);
        self.write_ops = self.write_ops.saturating_add(rhs.write_ops);
        self.write_bytes = self.write_bytes.saturating_add(rhs.write_bytes);
    }
}

impl SubAssign<&FileMetrics> for FileMetrics {
    fn sub_assign(&mut self, rhs: &FileMetrics) {
        debug_assert!(
            self.read_ops >= rhs.read_ops
                && self.read_bytes >= rhs.read_bytes
                && self.write_ops >= rhs.write_ops
                && self.write_bytes >= rhs.write_bytes,
            "subtracting more than was added: {self:?} - {rhs:?}"
        );
        self.read_ops = self.read_ops.saturating_sub(rhs.read_ops);
        self.read_bytes = self.read_bytes.saturating_sub(rhs.read_bytes);
        self.write_ops = self.write_ops.saturating_sub(rhs.write_ops);
        self.write_bytes = self.write_bytes.saturating_sub(rhs.write_bytes);
    }
}

/// One drained counter table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterEntry {
    pub key: CounterKey,
    pub counts: FileMetrics,
}

impl CounterEntry {
    pub fn new(key: CounterKey, counts: FileMetrics) -> Self {
        Self { key, counts }
    }
}
