use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use clap::Parser;

use nfs_traffic_viewer::cli::{Cli, ResolvedCli};
use nfs_traffic_viewer::collector;
use nfs_traffic_viewer::engine::{Aggregator, run_aggregation_loop};
use nfs_traffic_viewer::error::ViewerError;
use nfs_traffic_viewer::identity::UserDirectory;
use nfs_traffic_viewer::output;
use nfs_traffic_viewer::privilege;
use nfs_traffic_viewer::resolve::{EventStream, ResolutionCache, run_resolution_loop};
use nfs_traffic_viewer::source::CounterSource;
use nfs_traffic_viewer::tui::{self, Dashboard};

/// Global shutdown flag, set by signal handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

fn exit_code(err: &ViewerError) -> i32 {
    match err {
        ViewerError::InsufficientPermission(_) => 1,
        ViewerError::Collector(_) => 2,
        _ => 4,
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse().resolve();
    let is_tui = cli.is_monitor();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(cli)));

    // Restore terminal state only if TUI mode was used (snapshot never enters alternate screen).
    if is_tui {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen);
    }

    match result {
        Ok(Ok(())) => std::process::exit(0),
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code(&e));
        }
        Err(_) => {
            eprintln!("error: fatal: unexpected panic");
            std::process::exit(4);
        }
    }
}

fn run(cli: ResolvedCli) -> Result<(), ViewerError> {
    install_signal_handlers();
    privilege::check_collector_access()?;
    collector::preflight()?;
    open_and_run(&cli)
}

#[cfg(feature = "ebpf")]
fn open_and_run(cli: &ResolvedCli) -> Result<(), ViewerError> {
    let mut collector = collector::Collector::load(&cli.bpf_object)?;
    let (source, stream) = collector.take_sources(&SHUTDOWN_REQUESTED)?;
    let result = run_pipeline(cli, source, stream);
    // Detach only after both loops have stopped reading the maps.
    drop(collector);
    result
}

#[cfg(not(feature = "ebpf"))]
fn open_and_run(cli: &ResolvedCli) -> Result<(), ViewerError> {
    Err(collector::unavailable(&cli.bpf_object))
}

/// Spawn the aggregation and resolution loops, run the chosen mode, then
/// stop and join both loops.
#[cfg_attr(not(feature = "ebpf"), allow(dead_code))]
fn run_pipeline<S, E>(cli: &ResolvedCli, source: S, mut stream: E) -> Result<(), ViewerError>
where
    S: CounterSource + Send + 'static,
    E: EventStream + Send + 'static,
{
    let interval = cli.tick_interval();
    let aggregator = Aggregator::new(source, cli.window_capacity(), interval);
    let window = aggregator.shared();
    log::info!(
        "window: {} ticks of {:?} ({:?})",
        cli.window_capacity(),
        interval,
        aggregator.ring().horizon(interval)
    );

    let cache = Arc::new(ResolutionCache::new());
    let users = UserDirectory::new();

    let aggregate_handle = thread::Builder::new()
        .name("nfstv-aggregate".into())
        .spawn(move || run_aggregation_loop(aggregator, &SHUTDOWN_REQUESTED))
        .map_err(|e| ViewerError::Fatal(format!("spawn aggregation thread: {e}")))?;

    let cache_for_resolve = Arc::clone(&cache);
    let resolve_handle = thread::Builder::new()
        .name("nfstv-resolve".into())
        .spawn(move || run_resolution_loop(&mut stream, &cache_for_resolve))
        .map_err(|e| ViewerError::Fatal(format!("spawn resolution thread: {e}")))?;

    let result = if cli.is_monitor() {
        let dashboard = Dashboard {
            window: &window,
            names: &cache,
            users: &users,
        };
        tui::run_tui(dashboard, interval, cli.sort, cli.no_color, &SHUTDOWN_REQUESTED)
    } else {
        wait_for_snapshot(cli);
        Ok(())
    };

    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
    if aggregate_handle.join().is_err() {
        log::warn!("aggregation thread panicked");
    }
    if resolve_handle.join().is_err() {
        log::warn!("resolution thread panicked");
    }
    result?;

    if !cli.is_monitor() {
        let snapshot = window.load();
        log::info!(
            "snapshot: {} ticks, {} records, {} names cached",
            snapshot.ticks,
            snapshot.total().len(),
            cache.len()
        );
        let rows = output::build_rows(snapshot.total(), &cache, &users);
        output::write_snapshot(&rows, cli.format, &mut io::stdout().lock())?;
    }
    Ok(())
}

/// Block for the snapshot duration or until a signal arrives.
#[cfg_attr(not(feature = "ebpf"), allow(dead_code))]
fn wait_for_snapshot(cli: &ResolvedCli) {
    let duration = cli.snapshot_duration();
    let start = Instant::now();
    while start.elapsed() < duration {
        if SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(100));
    }
    log::info!("collected for {:.1}s", start.elapsed().as_secs_f64());
}
