pub mod json;
pub mod tsv;

use std::io::Write;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::ViewerError;
use crate::identity::UserDirectory;
use crate::model::WindowBucket;
use crate::resolve::ResolutionCache;

/// One (user, client, file) line of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub user: String,
    pub uid: u32,
    pub ip: Ipv4Addr,
    pub inode: u64,
    pub name: String,
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
}

impl SnapshotRow {
    pub fn io_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }
}

/// Flatten a window total into rows, busiest first.
pub fn build_rows(
    total: &WindowBucket,
    cache: &ResolutionCache,
    users: &UserDirectory,
) -> Vec<SnapshotRow> {
    let mut rows: Vec<SnapshotRow> = total
        .entries()
        .map(|(key, m)| SnapshotRow {
            user: users.name(key.uid),
            uid: key.uid,
            ip: key.remote,
            inode: key.inode,
            name: cache.resolve(key.inode),
            read_ops: m.read_ops,
            read_bytes: m.read_bytes,
            write_ops: m.write_ops,
            write_bytes: m.write_bytes,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.io_bytes()
            .cmp(&a.io_bytes())
            .then_with(|| (a.uid, a.ip, a.inode).cmp(&(b.uid, b.ip, b.inode)))
    });
    rows
}

/// Write snapshot rows in the specified format.
pub fn write_snapshot(
    rows: &[SnapshotRow],
    format: OutputFormat,
    writer: &mut impl Write,
) -> Result<(), ViewerError> {
    match format {
        OutputFormat::Tsv => tsv::write_tsv(rows, writer),
        OutputFormat::Json => json::write_json(rows, writer),
    }
}
