//! Inode to display-name resolution.
//!
//! The collector publishes a naming record every time it sees an inode
//! accessed. [`run_resolution_loop`] consumes those records and keeps the
//! latest name per inode in a [`ResolutionCache`] that the dashboard reads.

use std::borrow::Cow;
use std::sync::{PoisonError, RwLock};

use nfs_traffic_common::{INODE_EVENT_NAME_OFFSET, INODE_EVENT_PNAME_OFFSET, INODE_EVENT_SIZE, NAME_LEN};
use rustc_hash::FxHashMap;

use crate::error::ViewerError;

pub type StreamError = ViewerError;

/// Blocking source of raw naming records.
pub trait EventStream {
    /// Wait for the next record. `Ok(None)` means the stream is closed.
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, StreamError>;
}

impl EventStream for crossbeam_channel::Receiver<Vec<u8>> {
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        // A disconnected channel has no more senders.
        Ok(self.recv().ok())
    }
}

impl<E: EventStream + ?Sized> EventStream for Box<E> {
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        (**self).next_record()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated naming record: {len} bytes, expected {expected}")]
    Truncated { len: usize, expected: usize },
}

/// Decode one naming record into `(inode, "<owner>/<file>")`.
pub fn decode_event(data: &[u8]) -> Result<(u64, String), DecodeError> {
    if data.len() < INODE_EVENT_SIZE {
        return Err(DecodeError::Truncated {
            len: data.len(),
            expected: INODE_EVENT_SIZE,
        });
    }

    let mut ino = [0u8; 8];
    ino.copy_from_slice(&data[..8]);
    let inode = u64::from_le_bytes(ino);

    let file = c_field(&data[INODE_EVENT_NAME_OFFSET..INODE_EVENT_NAME_OFFSET + NAME_LEN]);
    let owner = c_field(&data[INODE_EVENT_PNAME_OFFSET..INODE_EVENT_PNAME_OFFSET + NAME_LEN]);
    Ok((inode, format!("{owner}/{file}")))
}

/// Bytes up to the first NUL, or the whole field if there is none.
fn c_field(field: &[u8]) -> Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}

/// Concurrent inode to display-name map. Last write wins; entries are
/// never purged.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    names: RwLock<FxHashMap<u64, String>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, inode: u64, name: String) {
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        names.insert(inode, name);
    }

    /// Decode `record` and store the mapping it carries.
    pub fn apply(&self, record: &[u8]) -> Result<u64, DecodeError> {
        let (inode, name) = decode_event(record)?;
        self.insert(inode, name);
        Ok(inode)
    }

    pub fn get(&self, inode: u64) -> Option<String> {
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
        names.get(&inode).cloned()
    }

    /// Display name for `inode`, or the inode in decimal if none is known.
    pub fn resolve(&self, inode: u64) -> String {
        self.get(inode).unwrap_or_else(|| inode.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters reported when the resolution loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub applied: u64,
    pub decode_errors: u64,
    pub read_errors: u64,
}

/// Consume `stream` until it closes, applying every record to `cache`.
///
/// Malformed records and read errors are logged and skipped.
pub fn run_resolution_loop<E: EventStream + ?Sized>(
    stream: &mut E,
    cache: &ResolutionCache,
) -> ResolutionStats {
    let mut stats = ResolutionStats::default();
    loop {
        match stream.next_record() {
            Ok(Some(record)) => match cache.apply(&record) {
                Ok(_) => stats.applied += 1,
                Err(e) => {
                    log::warn!("skipping naming record: {e}");
                    stats.decode_errors += 1;
                }
            },
            Ok(None) => break,
            Err(e) => {
                log::warn!("naming stream read error: {e}");
                stats.read_errors += 1;
            }
        }
    }
    log::info!(
        "resolution loop exit: applied={}, decode_errors={}, read_errors={}, cached={}",
        stats.applied,
        stats.decode_errors,
        stats.read_errors,
        cache.len()
    );
    stats
}

/// Build a raw naming record. Used by tests and in-process collectors.
pub fn encode_event(inode: u64, owner: &str, file: &str) -> Vec<u8> {
    let mut buf = vec![0u8; INODE_EVENT_SIZE];
    buf[..8].copy_from_slice(&inode.to_le_bytes());
    put_c_field(&mut buf[INODE_EVENT_NAME_OFFSET..INODE_EVENT_NAME_OFFSET + NAME_LEN], file);
    put_c_field(&mut buf[INODE_EVENT_PNAME_OFFSET..INODE_EVENT_PNAME_OFFSET + NAME_LEN], owner);
    buf
}

fn put_c_field(field: &mut [u8], s: &str) {
    let n = s.len().min(field.len() - 1);
    field[..n].copy_from_slice(&s.as_bytes()[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_then_updates() {
        let cache = ResolutionCache::new();
        assert_eq!(cache.resolve(42), "42");
        cache.apply(&encode_event(42, "nfsd", "report.csv")).unwrap();
        assert_eq!(cache.resolve(42), "nfsd/report.csv");
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ResolutionCache::new();
        cache.apply(&encode_event(7, "home", "a.txt")).unwrap();
        cache.apply(&encode_event(7, "home", "b.txt")).unwrap();
        assert_eq!(cache.resolve(7), "home/b.txt");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_decode_field_without_nul_uses_whole_field() {
        let mut rec = encode_event(1, "p", "");
        for b in &mut rec[INODE_EVENT_NAME_OFFSET..INODE_EVENT_NAME_OFFSET + NAME_LEN] {
            *b = b'x';
        }
        let (inode, name) = decode_event(&rec).unwrap();
        assert_eq!(inode, 1);
        assert_eq!(name, format!("p/{}", "x".repeat(NAME_LEN)));
    }

    #[test]
    fn test_decode_ignores_bytes_after_nul() {
        let mut rec = encode_event(3, "dir", "f");
        rec[INODE_EVENT_NAME_OFFSET + 2] = b'z';
        assert_eq!(decode_event(&rec).unwrap().1, "dir/f");
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let mut rec = encode_event(5, "dir", "");
        rec[INODE_EVENT_NAME_OFFSET] = 0xff;
        assert_eq!(decode_event(&rec).unwrap().1, "dir/\u{fffd}");
    }

    #[test]
    fn test_decode_truncated() {
        let rec = encode_event(5, "a", "b");
        let err = decode_event(&rec[..100]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { len: 100, expected: INODE_EVENT_SIZE });
    }

    #[test]
    fn test_loop_skips_bad_records_and_exits_on_close() {
        let (tx, mut rx) = crossbeam_channel::unbounded();
        tx.send(encode_event(1, "a", "one")).unwrap();
        tx.send(vec![0u8; 10]).unwrap();
        tx.send(encode_event(2, "b", "two")).unwrap();
        drop(tx);

        let cache = ResolutionCache::new();
        let stats = run_resolution_loop(&mut rx, &cache);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(cache.resolve(2), "b/two");
    }

    struct Hiccup {
        script: Vec<Result<Option<Vec<u8>>, StreamError>>,
    }

    impl EventStream for Hiccup {
        fn next_record(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
            if self.script.is_empty() {
                return Ok(None);
            }
            self.script.remove(0)
        }
    }

    #[test]
    fn test_loop_continues_after_read_error() {
        let mut stream = Hiccup {
            script: vec![
                Err(ViewerError::EventStream("EINTR".into())),
                Ok(Some(encode_event(9, "x", "y"))),
            ],
        };
        let cache = ResolutionCache::new();
        let stats = run_resolution_loop(&mut stream, &cache);
        assert_eq!(stats.read_errors, 1);
        assert_eq!(stats.applied, 1);
        assert_eq!(cache.resolve(9), "x/y");
    }
}
