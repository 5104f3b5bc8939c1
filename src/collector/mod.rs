// Kernel collector: the fentry programs on nfsd4_read/nfsd4_write, their
// counter map and their naming ring buffer.
//
// With the `ebpf` feature the collector is loaded with aya. Without it,
// `open` fails with a clear message and the rest of the crate is still
// usable against in-memory sources.

#[cfg(feature = "ebpf")]
mod ebpf;
#[cfg(feature = "ebpf")]
pub use ebpf::{BpfCounterSource, Collector, RingBufStream};

use std::path::Path;

use crate::error::ViewerError;

/// fentry needs 5.5, the BPF ring buffer needs 5.8.
const MIN_KERNEL: (u32, u32) = (5, 8);

/// Check the running kernel can host the collector.
///
/// Requirements:
/// 1. Kernel version >= 5.8
/// 2. BTF type information at /sys/kernel/btf/vmlinux (fentry attach)
pub fn preflight() -> Result<(), ViewerError> {
    let version = std::fs::read_to_string("/proc/version")
        .map_err(|e| ViewerError::Collector(format!("read /proc/version: {e}")))?;
    require_kernel(&version, MIN_KERNEL)?;

    if !btf_available() {
        return Err(ViewerError::Collector(
            "BTF not available (/sys/kernel/btf/vmlinux missing)".to_string(),
        ));
    }
    log::debug!("collector preflight passed");
    Ok(())
}

/// Fail if `/proc/version` names a release older than `min`. An
/// unparseable string only warns; the load itself reports the real error.
fn require_kernel(proc_version: &str, min: (u32, u32)) -> Result<(), ViewerError> {
    match kernel_release(proc_version) {
        Some(found) if found >= min => Ok(()),
        Some((major, minor)) => Err(ViewerError::Collector(format!(
            "kernel {major}.{minor} is too old, need {}.{} or later",
            min.0, min.1
        ))),
        None => {
            log::warn!("could not parse kernel version from {proc_version:?}, continuing");
            Ok(())
        }
    }
}

/// (major, minor) of the release token following the `version` keyword.
fn kernel_release(proc_version: &str) -> Option<(u32, u32)> {
    let release = proc_version
        .split_whitespace()
        .skip_while(|t| !t.eq_ignore_ascii_case("version"))
        .nth(1)?;
    let mut numbers = release.split(|c: char| !c.is_ascii_digit());
    let major = numbers.next()?.parse().ok()?;
    let minor = numbers.next()?.parse().ok()?;
    Some((major, minor))
}

fn btf_available() -> bool {
    Path::new("/sys/kernel/btf/vmlinux").exists()
}

#[cfg(not(feature = "ebpf"))]
pub fn unavailable(_object: &Path) -> ViewerError {
    ViewerError::Collector("eBPF support not compiled in (build with --features ebpf)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_release_forms() {
        let ubuntu = "Linux version 5.15.0-91-generic (buildd@lcy02-amd64-060)";
        assert_eq!(kernel_release(ubuntu), Some((5, 15)));
        assert_eq!(kernel_release("Linux version 6.7-arch1-1 (linux@archlinux)"), Some((6, 7)));
        let builder = "Linux (compiled by user.name) version 5.15.0-generic";
        assert_eq!(kernel_release(builder), Some((5, 15)));
    }

    #[test]
    fn kernel_release_rejects_garbage() {
        assert_eq!(kernel_release(""), None);
        assert_eq!(kernel_release("Linux 5.15.0-generic"), None);
        assert_eq!(kernel_release("Linux version"), None);
        assert_eq!(kernel_release("Linux version abc.def"), None);
        assert_eq!(kernel_release("Linux version 6"), None);
    }

    #[test]
    fn require_kernel_against_minimum() {
        assert!(require_kernel("Linux version 5.8.0", MIN_KERNEL).is_ok());
        assert!(require_kernel("Linux version 6.1.0-13-amd64", MIN_KERNEL).is_ok());
        let err = require_kernel("Linux version 5.4.0-150-generic", MIN_KERNEL).unwrap_err();
        assert!(matches!(err, ViewerError::Collector(_)));
        assert!(err.to_string().contains("5.4 is too old"));
        // Unparseable strings do not block startup.
        assert!(require_kernel("unknown", MIN_KERNEL).is_ok());
    }
}
