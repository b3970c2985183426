//! promsiftd - filtered metrics export daemon.
//!
//! Waits for the metric source to become ready, loads the filter rules
//! once, then runs the collect → filter → export cycle on a fixed-delay
//! schedule, overwriting a single text-exposition file.
//!
//! The daemon drives the built-in simulated registry so the whole
//! pipeline is runnable and observable end to end; real deployments embed
//! the `promsift` library and implement `registry::MetricSource` against
//! the host process's live registry.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use promsift::export::{DEFAULT_OUTPUT_PATH, DEFAULT_RULES_PATH, ExportScheduler, await_ready};
use promsift::filter::MetricFilter;
use promsift::mock::MockSource;
use promsift::pipeline::CollectionPipeline;

/// Filtered metrics export daemon.
#[derive(Parser)]
#[command(name = "promsiftd", about = "Filtered metrics export daemon", version)]
struct Args {
    /// Path to the JSON filter-rules file.
    #[arg(default_value = DEFAULT_RULES_PATH)]
    rules: PathBuf,

    /// Export period in seconds.
    #[arg(short, long, default_value = "300")]
    interval: u64,

    /// Delay in seconds before the first export cycle.
    #[arg(long, default_value = "60")]
    initial_delay: u64,

    /// Output file, fully overwritten on every cycle.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("promsiftd={}", level).parse().unwrap())
        .add_directive(format!("promsift={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("promsiftd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: rules={}, interval={}s, initial_delay={}s, output={}",
        args.rules.display(),
        args.interval,
        args.initial_delay,
        args.output.display()
    );

    // Graceful shutdown on Ctrl-C.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let source = MockSource::typical_process();

    // Readiness wait aborts cleanly on shutdown; collection then simply
    // never starts.
    if !await_ready(&source, &running) {
        info!("Shutdown requested while waiting for the metric source; exiting");
        return;
    }
    info!("Metric source is ready");

    // Rules are loaded once per process lifetime; any load or compile
    // failure degrades to pass-everything with a warning.
    let filter = MetricFilter::from_path(&args.rules);

    let pipeline = CollectionPipeline::new(source, filter);
    let mut scheduler = ExportScheduler::new(pipeline, &args.output)
        .with_period(Duration::from_secs(args.interval))
        .with_initial_delay(Duration::from_secs(args.initial_delay));

    // The main thread is the single dedicated export worker.
    scheduler.run(&running);

    info!("Shutdown complete");
}
