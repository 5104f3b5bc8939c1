use std::net::Ipv4Addr;
use std::os::fd::{AsFd, AsRawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use aya::maps::{HashMap as BpfHashMap, MapData, RingBuf};
use aya::programs::FEntry;
use aya::{Btf, Ebpf};
use nfs_traffic_common::{
    EVENTS_MAP_NAME, OPS_MAP_NAME, OpsKey, OpsValue, READ_PROGRAM, READ_TARGET, WRITE_PROGRAM,
    WRITE_TARGET,
};

use crate::error::ViewerError;
use crate::model::{CounterKey, FileMetrics};
use crate::resolve::{EventStream, StreamError};
use crate::source::{CounterSource, SourceError};

/// How long one ring buffer poll waits before rechecking shutdown.
const POLL_TIMEOUT_MS: libc::c_int = 200;

/// Loaded and attached collector object.
///
/// Programs stay attached for as long as this value lives.
pub struct Collector {
    ebpf: Ebpf,
}

impl Collector {
    /// Load `object` and attach both fentry programs.
    pub fn load(object: &Path) -> Result<Self, ViewerError> {
        let mut ebpf = Ebpf::load_file(object)
            .map_err(|e| ViewerError::Collector(format!("load {}: {e}", object.display())))?;
        let btf = Btf::from_sys_fs().map_err(|e| ViewerError::Collector(format!("BTF: {e}")))?;

        attach_fentry(&mut ebpf, &btf, WRITE_PROGRAM, WRITE_TARGET)?;
        attach_fentry(&mut ebpf, &btf, READ_PROGRAM, READ_TARGET)?;
        log::info!("collector attached: {WRITE_PROGRAM}->{WRITE_TARGET}, {READ_PROGRAM}->{READ_TARGET}");
        Ok(Self { ebpf })
    }

    /// Take the counter map and the naming ring buffer. Both can be taken
    /// once.
    pub fn take_sources(
        &mut self,
        shutdown: &'static AtomicBool,
    ) -> Result<(BpfCounterSource, RingBufStream), ViewerError> {
        let ops = self
            .ebpf
            .take_map(OPS_MAP_NAME)
            .ok_or_else(|| ViewerError::Collector(format!("map '{OPS_MAP_NAME}' not found")))?;
        let ops = BpfHashMap::try_from(ops)
            .map_err(|e| ViewerError::Collector(format!("map '{OPS_MAP_NAME}': {e}")))?;

        let events = self
            .ebpf
            .take_map(EVENTS_MAP_NAME)
            .ok_or_else(|| ViewerError::Collector(format!("map '{EVENTS_MAP_NAME}' not found")))?;
        let events = RingBuf::try_from(events)
            .map_err(|e| ViewerError::Collector(format!("map '{EVENTS_MAP_NAME}': {e}")))?;

        Ok((BpfCounterSource { map: ops }, RingBufStream { ring: events, shutdown }))
    }
}

fn attach_fentry(ebpf: &mut Ebpf, btf: &Btf, prog_name: &str, target: &str) -> Result<(), ViewerError> {
    let prog: &mut FEntry = ebpf
        .program_mut(prog_name)
        .ok_or_else(|| ViewerError::Collector(format!("program '{prog_name}' not found")))?
        .try_into()
        .map_err(|e| ViewerError::Collector(format!("'{prog_name}' is not an fentry program: {e}")))?;
    prog.load(target, btf)
        .map_err(|e| ViewerError::Collector(format!("load {prog_name}: {e}")))?;
    prog.attach()
        .map_err(|e| ViewerError::Collector(format!("attach {prog_name} to {target}: {e}")))?;
    log::debug!("attached fentry {prog_name} -> {target}");
    Ok(())
}

fn to_kernel_key(key: &CounterKey) -> OpsKey {
    OpsKey {
        ino: key.inode,
        uid: key.uid,
        ipv4: u32::from_ne_bytes(key.remote.octets()),
    }
}

fn from_kernel_key(key: &OpsKey) -> CounterKey {
    // ipv4 holds the address bytes in network order.
    CounterKey::new(key.uid, key.ino, Ipv4Addr::from(key.ipv4.to_ne_bytes()))
}

/// The kernel `nfs_ops_counts` hash map.
pub struct BpfCounterSource {
    map: BpfHashMap<MapData, OpsKey, OpsValue>,
}

impl CounterSource for BpfCounterSource {
    fn keys(&mut self) -> Result<Vec<CounterKey>, SourceError> {
        let mut keys = Vec::new();
        for key in self.map.keys() {
            match key {
                Ok(k) => keys.push(from_kernel_key(&k)),
                Err(e) => log::warn!("counter map key iteration: {e}"),
            }
        }
        Ok(keys)
    }

    // get then remove: an increment landing in between is lost.
    fn take(&mut self, key: &CounterKey) -> Result<FileMetrics, SourceError> {
        let k = to_kernel_key(key);
        let v = self
            .map
            .get(&k, 0)
            .map_err(|e| ViewerError::CounterSource(format!("lookup {key}: {e}")))?;
        self.map
            .remove(&k)
            .map_err(|e| ViewerError::CounterSource(format!("delete {key}: {e}")))?;
        Ok(FileMetrics::new(v.r_ops, v.r_bytes, v.w_ops, v.w_bytes))
    }
}

/// The kernel `events` ring buffer. Reports closure once `shutdown` is set.
pub struct RingBufStream {
    ring: RingBuf<MapData>,
    shutdown: &'static AtomicBool,
}

impl EventStream for RingBufStream {
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(None);
            }
            if let Some(item) = self.ring.next() {
                return Ok(Some(item.to_vec()));
            }

            let mut pfd = libc::pollfd {
                fd: self.ring.as_fd().as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let rc = unsafe { libc::poll(&mut pfd, 1, POLL_TIMEOUT_MS) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ViewerError::EventStream(format!("poll ring buffer: {err}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_key_address_is_network_order() {
        // 10.0.0.5 as copied from sockaddr_in on any host.
        let raw = u32::from_ne_bytes([10, 0, 0, 5]);
        let key = from_kernel_key(&OpsKey { ino: 42, uid: 1000, ipv4: raw });
        assert_eq!(key, CounterKey::new(1000, 42, Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(to_kernel_key(&key).ipv4, raw);
    }
}
