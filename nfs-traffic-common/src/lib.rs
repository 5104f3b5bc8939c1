//! Shared data structures between the nfsd eBPF probes and userspace.
//!
//! These types must be `#[repr(C)]` to ensure consistent memory layout
//! across kernel and userspace. Both sides must agree on the exact
//! byte layout of map keys, map values and ring buffer records.

#![no_std]

/// Key for the per-operation counter map (`nfs_ops_counts`).
///
/// One entry per (inode, uid, client address) combination. The probes
/// create the entry on first access and increment it in place afterwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpsKey {
    /// Inode number of the file being accessed.
    pub ino: u64,
    /// Credential uid of the RPC request.
    pub uid: u32,
    /// Client IPv4 address, network byte order as copied from `sockaddr_in`.
    /// Zero when the client is not IPv4.
    pub ipv4: u32,
}

/// Value for the per-operation counter map.
///
/// Counts accumulate until userspace removes the entry.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpsValue {
    pub w_ops: u64,
    pub w_bytes: u64,
    pub r_ops: u64,
    pub r_bytes: u64,
}

/// Length of each name field in [`InodeEvent`], including the NUL terminator.
pub const NAME_LEN: usize = 64;

/// Inode naming record published on the `events` ring buffer.
///
/// `name` is the dentry name of the accessed file. `pname` is the owner
/// label shown in front of it; the nfsd probes fill it with the parent
/// dentry name. Both are NUL-terminated, trailing bytes are garbage.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct InodeEvent {
    pub ino: u64,
    pub name: [u8; NAME_LEN],
    pub pname: [u8; NAME_LEN],
}

/// Byte size of one [`InodeEvent`] record on the ring buffer.
pub const INODE_EVENT_SIZE: usize = core::mem::size_of::<InodeEvent>();

/// Byte offset of [`InodeEvent::name`] within a record.
pub const INODE_EVENT_NAME_OFFSET: usize = 8;

/// Byte offset of [`InodeEvent::pname`] within a record.
pub const INODE_EVENT_PNAME_OFFSET: usize = INODE_EVENT_NAME_OFFSET + NAME_LEN;

/// Maximum number of entries in the counter map.
pub const OPS_MAP_MAX_ENTRIES: u32 = 10240;

/// Ring buffer size in bytes for inode naming events.
pub const EVENTS_RINGBUF_SIZE: u32 = 1 << 12;

/// Map and program names inside the compiled collector object.
pub const OPS_MAP_NAME: &str = "nfs_ops_counts";
pub const EVENTS_MAP_NAME: &str = "events";
pub const WRITE_PROGRAM: &str = "write_ops";
pub const READ_PROGRAM: &str = "read_ops";

/// Kernel functions the fentry programs attach to.
pub const WRITE_TARGET: &str = "nfsd4_write";
pub const READ_TARGET: &str = "nfsd4_read";

// Compile-time size assertions to catch layout mismatches early.
const _: () = assert!(core::mem::size_of::<OpsKey>() == 16);
const _: () = assert!(core::mem::size_of::<OpsValue>() == 32);
const _: () = assert!(INODE_EVENT_SIZE == 136);
const _: () = assert!(core::mem::offset_of!(InodeEvent, name) == INODE_EVENT_NAME_OFFSET);
const _: () = assert!(core::mem::offset_of!(InodeEvent, pname) == INODE_EVENT_PNAME_OFFSET);

#[cfg(feature = "user")]
unsafe impl aya::Pod for OpsKey {}

#[cfg(feature = "user")]
unsafe impl aya::Pod for OpsValue {}
