use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use rustc_hash::FxHashMap;

use crate::model::{CounterEntry, CounterKey, FileMetrics};

/// Stable handle of a [`FileMetrics`] record inside one [`WindowBucket`].
///
/// Handles are only meaningful for the bucket that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(usize);

/// Per-user index key: which file, reached from which client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodePeer {
    pub inode: u64,
    pub remote: Ipv4Addr,
}

impl From<&CounterKey> for InodePeer {
    fn from(key: &CounterKey) -> Self {
        Self {
            inode: key.inode,
            remote: key.remote,
        }
    }
}

/// Per-client index key: which file, accessed as which user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodeUser {
    pub inode: u64,
    pub uid: u32,
}

impl From<&CounterKey> for InodeUser {
    fn from(key: &CounterKey) -> Self {
        Self {
            inode: key.inode,
            uid: key.uid,
        }
    }
}

/// Traffic produced by one user, indexed by (inode, client).
#[derive(Clone, Debug)]
pub struct UserMetrics {
    uid: u32,
    files: FxHashMap<InodePeer, FileId>,
    usage: u64,
}

impl UserMetrics {
    fn new(uid: u32) -> Self {
        Self {
            uid,
            files: FxHashMap::default(),
            usage: 0,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Read plus write bytes over every file this user touched.
    pub fn usage(&self) -> u64 {
        self.usage
    }

    pub fn file(&self, key: InodePeer) -> Option<FileId> {
        self.files.get(&key).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (InodePeer, FileId)> + '_ {
        self.files.iter().map(|(k, id)| (*k, *id))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Traffic from one remote client, indexed by (inode, uid).
#[derive(Clone, Debug)]
pub struct IpMetrics {
    addr: Ipv4Addr,
    files: FxHashMap<InodeUser, FileId>,
    usage: u64,
}

impl IpMetrics {
    fn new(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            files: FxHashMap::default(),
            usage: 0,
        }
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// Read plus write bytes over every file this client touched.
    pub fn usage(&self) -> u64 {
        self.usage
    }

    pub fn file(&self, key: InodeUser) -> Option<FileId> {
        self.files.get(&key).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (InodeUser, FileId)> + '_ {
        self.files.iter().map(|(k, id)| (*k, *id))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of distinct uids seen from this client.
    pub fn user_count(&self) -> usize {
        let mut uids: Vec<u32> = self.files.keys().map(|k| k.uid).collect();
        uids.sort_unstable();
        uids.dedup();
        uids.len()
    }
}

#[derive(Clone, Debug)]
struct FileRecord {
    key: CounterKey,
    metrics: FileMetrics,
}

/// Aggregated traffic for one tick (or, as a ring's rolling total, for
/// all ticks currently in the window).
///
/// Records live in a single arena. The user index and the client index
/// both hold [`FileId`] handles into it, so a record reached through
/// either index is the same record.
#[derive(Clone, Debug, Default)]
pub struct WindowBucket {
    records: Vec<FileRecord>,
    users: FxHashMap<u32, UserMetrics>,
    ips: FxHashMap<Ipv4Addr, IpMetrics>,
}

impl WindowBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one drained entry into the bucket.
    pub fn record(&mut self, entry: &CounterEntry) -> FileId {
        self.add(entry.key, &entry.counts)
    }

    /// Add `counts` to the record for `key`, creating the record and both
    /// index entries if this is the first time the key is seen.
    pub fn add(&mut self, key: CounterKey, counts: &FileMetrics) -> FileId {
        let bytes = counts.io_bytes();
        let user = self
            .users
            .entry(key.uid)
            .or_insert_with(|| UserMetrics::new(key.uid));
        let ip = self
            .ips
            .entry(key.remote)
            .or_insert_with(|| IpMetrics::new(key.remote));

        let id = *user.files.entry(InodePeer::from(&key)).or_insert_with(|| {
            let id = FileId(self.records.len());
            self.records.push(FileRecord {
                key,
                metrics: FileMetrics::default(),
            });
            id
        });
        ip.files.entry(InodeUser::from(&key)).or_insert(id);

        self.records[id.0].metrics += counts;
        user.usage = user.usage.saturating_add(bytes);
        ip.usage = ip.usage.saturating_add(bytes);
        id
    }

    /// Add every record of `other` into this bucket.
    pub fn merge(&mut self, other: &WindowBucket) {
        for rec in &other.records {
            self.add(rec.key, &rec.metrics);
        }
    }

    /// Remove the contribution of `other`, which must have been merged
    /// into this bucket earlier. Records that drop to zero are deleted
    /// together with their index entries.
    pub fn subtract(&mut self, other: &WindowBucket) {
        for rec in &other.records {
            self.sub(rec.key, &rec.metrics);
        }
    }

    fn sub(&mut self, key: CounterKey, counts: &FileMetrics) {
        let Some(id) = self
            .users
            .get(&key.uid)
            .and_then(|u| u.file(InodePeer::from(&key)))
        else {
            if !counts.is_zero() {
                log::warn!("subtracting unknown record {key}, ignored");
            }
            return;
        };

        let bytes = counts.io_bytes();
        if let Some(user) = self.users.get_mut(&key.uid) {
            user.usage = user.usage.saturating_sub(bytes);
        }
        if let Some(ip) = self.ips.get_mut(&key.remote) {
            ip.usage = ip.usage.saturating_sub(bytes);
        }

        let record = &mut self.records[id.0];
        record.metrics -= counts;
        if record.metrics.is_zero() {
            self.remove_record(id);
        }
    }

    fn remove_record(&mut self, id: FileId) {
        let removed = self.records.swap_remove(id.0);
        self.unlink(&removed.key);

        // The former last record now lives at `id`; repoint its handles.
        if let Some(moved) = self.records.get(id.0).map(|r| r.key) {
            if let Some(user) = self.users.get_mut(&moved.uid) {
                user.files.insert(InodePeer::from(&moved), id);
            }
            if let Some(ip) = self.ips.get_mut(&moved.remote) {
                ip.files.insert(InodeUser::from(&moved), id);
            }
        }
    }

    fn unlink(&mut self, key: &CounterKey) {
        if let Some(user) = self.users.get_mut(&key.uid) {
            user.files.remove(&InodePeer::from(key));
            if user.files.is_empty() {
                self.users.remove(&key.uid);
            }
        }
        if let Some(ip) = self.ips.get_mut(&key.remote) {
            ip.files.remove(&InodeUser::from(key));
            if ip.files.is_empty() {
                self.ips.remove(&key.remote);
            }
        }
    }

    pub fn metrics(&self, id: FileId) -> Option<&FileMetrics> {
        self.records.get(id.0).map(|r| &r.metrics)
    }

    pub fn user(&self, uid: u32) -> Option<&UserMetrics> {
        self.users.get(&uid)
    }

    pub fn users(&self) -> impl Iterator<Item = &UserMetrics> {
        self.users.values()
    }

    pub fn ip(&self, addr: Ipv4Addr) -> Option<&IpMetrics> {
        self.ips.get(&addr)
    }

    pub fn ips(&self) -> impl Iterator<Item = &IpMetrics> {
        self.ips.values()
    }

    /// Look up a record through the user index.
    pub fn user_file(&self, uid: u32, inode: u64, remote: Ipv4Addr) -> Option<&FileMetrics> {
        let id = self.user(uid)?.file(InodePeer { inode, remote })?;
        self.metrics(id)
    }

    /// Look up a record through the client index.
    pub fn ip_file(&self, remote: Ipv4Addr, inode: u64, uid: u32) -> Option<&FileMetrics> {
        let id = self.ip(remote)?.file(InodeUser { inode, uid })?;
        self.metrics(id)
    }

    /// Files touched by `uid`, with their metrics.
    pub fn files_of_user(&self, uid: u32) -> impl Iterator<Item = (InodePeer, &FileMetrics)> {
        self.user(uid)
            .into_iter()
            .flat_map(|u| u.files())
            .filter_map(move |(k, id)| self.metrics(id).map(|m| (k, m)))
    }

    /// Files touched from `addr`, with their metrics.
    pub fn files_of_ip(&self, addr: Ipv4Addr) -> impl Iterator<Item = (InodeUser, &FileMetrics)> {
        self.ip(addr)
            .into_iter()
            .flat_map(|i| i.files())
            .filter_map(move |(k, id)| self.metrics(id).map(|m| (k, m)))
    }

    /// Every record, in arena order.
    pub fn entries(&self) -> impl Iterator<Item = (CounterKey, &FileMetrics)> {
        self.records.iter().map(|r| (r.key, &r.metrics))
    }

    /// Records keyed and ordered by (uid, inode, remote), independent of
    /// the order they were aggregated in.
    pub fn by_key(&self) -> BTreeMap<CounterKey, FileMetrics> {
        self.records.iter().map(|r| (r.key, r.metrics)).collect()
    }

    /// Sum of every record.
    pub fn totals(&self) -> FileMetrics {
        let mut sum = FileMetrics::default();
        for rec in &self.records {
            sum += &rec.metrics;
        }
        sum
    }

    /// Read plus write bytes over the whole bucket.
    pub fn usage(&self) -> u64 {
        self.users
            .values()
            .fold(0u64, |acc, u| acc.saturating_add(u.usage))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Build one bucket from a tick's drained entries.
///
/// Counter addition commutes, so entry order does not affect the result.
/// Partitions can be aggregated separately and combined with
/// [`WindowBucket::merge`].
pub fn aggregate<'a>(entries: impl IntoIterator<Item = &'a CounterEntry>) -> WindowBucket {
    let mut bucket = WindowBucket::new();
    for entry in entries {
        bucket.record(entry);
    }
    bucket
}
