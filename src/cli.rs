use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub const DEFAULT_BPF_OBJECT: &str = "nfs-traffic-collector.bpf.o";
const DEFAULT_WINDOW: usize = 900;

#[derive(Parser, Debug)]
#[command(
    name = "nfs-traffic-viewer",
    version,
    about = "Per-user and per-client NFS server traffic monitor"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Launch interactive TUI (default when no subcommand given)
    Monitor(MonitorArgs),
    /// Collect for a while, then print the window total to stdout
    Snapshot(SnapshotArgs),
}

/// Arguments shared by all capture modes.
#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Aggregation tick length in seconds [default: 1.0]
    #[arg(long, default_value_t = 1.0, value_parser = validate_interval)]
    pub interval: f64,

    /// Number of ticks kept in the sliding window [default: 900]
    #[arg(long, default_value_t = DEFAULT_WINDOW, value_parser = validate_window)]
    pub window: usize,

    /// Compiled collector object to load
    #[arg(long, default_value = DEFAULT_BPF_OBJECT)]
    pub bpf_object: PathBuf,
}

impl Default for CaptureArgs {
    fn default() -> Self {
        Self {
            interval: 1.0,
            window: DEFAULT_WINDOW,
            bpf_object: PathBuf::from(DEFAULT_BPF_OBJECT),
        }
    }
}

/// Arguments specific to monitor (TUI) mode.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Initial sort column
    #[arg(long, default_value = "usage")]
    pub sort: SortColumn,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments specific to snapshot mode.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Output format [default: tsv]
    #[arg(long, default_value = "tsv")]
    pub format: OutputFormat,

    /// How long to collect before producing output, in seconds [default: 5.0]
    #[arg(long, default_value_t = 5.0, value_parser = validate_duration)]
    pub duration: f64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Usage,
    User,
    Reads,
    Writes,
}

fn validate_interval(s: &str) -> Result<f64, String> {
    let val: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if val < 0.1 {
        Err("interval must be at least 0.1 seconds".to_string())
    } else if val > 10.0 {
        Err("interval must be at most 10.0 seconds".to_string())
    } else {
        Ok(val)
    }
}

fn validate_window(s: &str) -> Result<usize, String> {
    let val: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 1 {
        Err("window must hold at least 1 tick".to_string())
    } else if val > 86_400 {
        Err("window must be at most 86400 ticks".to_string())
    } else {
        Ok(val)
    }
}

fn validate_duration(s: &str) -> Result<f64, String> {
    let val: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if val < 1.0 {
        Err("duration must be at least 1.0 seconds".to_string())
    } else if val > 3600.0 {
        Err("duration must be at most 3600.0 seconds".to_string())
    } else {
        Ok(val)
    }
}

/// Flattened CLI configuration after resolving subcommand variants.
pub struct ResolvedCli {
    pub interval: f64,
    pub window: usize,
    pub bpf_object: PathBuf,
    pub format: OutputFormat,
    pub sort: SortColumn,
    pub no_color: bool,
    pub duration: f64,
    snapshot: bool,
}

impl ResolvedCli {
    pub fn is_monitor(&self) -> bool {
        !self.snapshot
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    pub fn snapshot_duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration)
    }

    pub fn window_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.window).unwrap_or(NonZeroUsize::MIN)
    }
}

impl Cli {
    /// Resolve subcommand variants into a flat configuration struct.
    pub fn resolve(self) -> ResolvedCli {
        match self.command {
            Some(Command::Snapshot(s)) => ResolvedCli {
                interval: s.capture.interval,
                window: s.capture.window,
                bpf_object: s.capture.bpf_object,
                format: s.format,
                sort: SortColumn::Usage,
                no_color: false,
                duration: s.duration,
                snapshot: true,
            },
            Some(Command::Monitor(m)) => ResolvedCli {
                interval: m.capture.interval,
                window: m.capture.window,
                bpf_object: m.capture.bpf_object,
                format: OutputFormat::Tsv,
                sort: m.sort,
                no_color: m.no_color,
                duration: 0.0,
                snapshot: false,
            },
            None => {
                let capture = CaptureArgs::default();
                ResolvedCli {
                    interval: capture.interval,
                    window: capture.window,
                    bpf_object: capture.bpf_object,
                    format: OutputFormat::Tsv,
                    sort: SortColumn::Usage,
                    no_color: false,
                    duration: 0.0,
                    snapshot: false,
                }
            }
        }
    }
}
