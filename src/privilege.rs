use crate::error::ViewerError;

const CAP_SYS_ADMIN: u32 = 21;
const CAP_PERFMON: u32 = 38;
const CAP_BPF: u32 = 39;

/// Check that we may load and attach the collector programs.
///
/// Root always may. Otherwise the effective capability set must carry
/// CAP_BPF and CAP_PERFMON, or CAP_SYS_ADMIN on older kernels.
pub fn check_collector_access() -> Result<(), ViewerError> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    let caps = std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| effective_caps(&s));
    if let Some(caps) = caps {
        if has_bpf_caps(caps) {
            log::info!("running without root, using CAP_BPF/CAP_PERFMON");
            return Ok(());
        }
    }

    Err(ViewerError::InsufficientPermission(
        "nfs-traffic-viewer needs to load eBPF programs. Either:\n  \
         1. Run with sudo: sudo nfs-traffic-viewer\n  \
         2. Grant capabilities: sudo setcap cap_bpf,cap_perfmon+ep $(which nfs-traffic-viewer)"
            .to_string(),
    ))
}

/// Parse the `CapEff:` line of `/proc/<pid>/status`.
fn effective_caps(status: &str) -> Option<u64> {
    let hex = status
        .lines()
        .find_map(|l| l.strip_prefix("CapEff:"))?
        .trim();
    u64::from_str_radix(hex, 16).ok()
}

fn has_bpf_caps(caps: u64) -> bool {
    let has = |cap: u32| caps & (1u64 << cap) != 0;
    has(CAP_SYS_ADMIN) || (has(CAP_BPF) && has(CAP_PERFMON))
}
