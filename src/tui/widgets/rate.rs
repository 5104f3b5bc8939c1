use std::time::Duration;

const UNITS: [(f64, &str); 3] = [(1e9, "GB"), (1e6, "MB"), (1e3, "KB")];

/// Scale a byte quantity to the largest SI unit (1 KB = 1000 bytes) it
/// reaches, with one decimal. Below 1 KB the plain count is returned.
fn scaled(value: f64, suffix: &str) -> String {
    UNITS
        .iter()
        .find(|(unit, _)| value >= *unit)
        .map(|(unit, name)| format!("{:.1} {name}{suffix}", value / unit))
        .unwrap_or_else(|| format!("{value:.0} B{suffix}"))
}

/// Throughput figure, e.g. `"512 B/s"` or `"23.4 MB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    scaled(bytes_per_sec, "/s")
}

/// Byte total, e.g. `"0 B"` or `"4.1 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    scaled(bytes as f64, "")
}

/// Compact window length: `"45s"`, `"15m"`, `"1h30m"`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        if d.subsec_millis() > 0 && secs < 10 {
            return format!("{:.1}s", d.as_secs_f64());
        }
        format!("{secs}s")
    } else if secs < 3600 {
        if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}m{}s", secs / 60, secs % 60)
        }
    } else if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}
