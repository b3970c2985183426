//! Fixed-delay export scheduling and the flat-file sink.
//!
//! A single worker drives the pipeline: wait for the source registry to
//! become ready, sleep through the initial delay, then loop collect →
//! serialize → overwrite the output file, sleeping the full period after
//! each completed cycle (fixed delay, so cycles never overlap — a slow
//! cycle pushes the next one back instead of running concurrently).
//!
//! Every wait is chunked into short sleeps against the shutdown flag, so
//! Ctrl-C interrupts a 5-minute period within ~100 ms.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::expose;
use crate::pipeline::CollectionPipeline;
use crate::registry::MetricSource;

/// Default time between export cycles.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60);
/// Default delay before the first cycle.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60);
/// Default output file, fully overwritten on every successful cycle.
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/promsift_metrics.txt";
/// Default rule-config file.
pub const DEFAULT_RULES_PATH: &str = "/etc/promsift/metrics_filter.json";
/// How often the readiness wait re-probes the source.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(5);

const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// A failed export cycle. Never fatal: the scheduler logs it and waits for
/// the next cycle, leaving the previous output file untouched.
#[derive(Debug)]
pub enum ExportError {
    /// Failed to create or write the output file.
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Outcome of one successful cycle, for logging.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub families: usize,
    pub samples: usize,
    pub collection_ms: f64,
}

/// Runs the collection pipeline on a fixed-delay schedule and writes the
/// exposition text to a single flat file.
pub struct ExportScheduler<S: MetricSource> {
    pipeline: CollectionPipeline<S>,
    output_path: PathBuf,
    period: Duration,
    initial_delay: Duration,
}

impl<S: MetricSource> ExportScheduler<S> {
    pub fn new(pipeline: CollectionPipeline<S>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            output_path: output_path.into(),
            period: DEFAULT_PERIOD,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Runs one cycle: collect, serialize, overwrite the output file.
    pub fn run_cycle(&mut self) -> Result<CycleReport, ExportError> {
        let families = self.pipeline.collect();
        let samples = families.iter().map(|f| f.samples.len()).sum();

        let file = File::create(&self.output_path)?;
        let mut writer = BufWriter::new(file);
        expose::write_text(&mut writer, &families)?;
        writer.flush()?;

        Ok(CycleReport {
            families: families.len(),
            samples,
            collection_ms: self.pipeline.last_collection_ms(),
        })
    }

    /// Runs the fixed-delay loop on the calling thread until `running`
    /// goes false. Per-cycle failures are logged and skipped.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Export schedule: period={:?}, initial_delay={:?}, output={}",
            self.period,
            self.initial_delay,
            self.output_path.display()
        );

        sleep_responsive(self.initial_delay, running);

        let mut cycle: u64 = 0;
        while running.load(Ordering::SeqCst) {
            cycle += 1;
            let started = Instant::now();

            match self.run_cycle() {
                Ok(report) => {
                    info!(
                        "Cycle #{}: wrote {} families ({} samples) in {:.1} ms collection time",
                        cycle, report.families, report.samples, report.collection_ms
                    );
                }
                Err(e) => {
                    error!("Cycle #{}: export failed, previous file kept: {}", cycle, e);
                }
            }

            // Fixed-delay self-throttling keeps slow cycles from
            // overlapping, but the resulting drift deserves a trace.
            let elapsed = started.elapsed();
            if elapsed > self.period {
                warn!(
                    "Cycle #{} ran {:?}, longer than the {:?} period; schedule is drifting",
                    cycle, elapsed, self.period
                );
            }

            sleep_responsive(self.period, running);
        }

        info!("Export scheduler stopped");
    }

    /// Spawns the loop on a dedicated background thread.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> JoinHandle<()>
    where
        S: Send + 'static,
    {
        thread::Builder::new()
            .name("promsift-export".to_string())
            .spawn(move || self.run(&running))
            .expect("failed to spawn export thread")
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Blocks until the source registry reports ready, probing every
/// [`READY_POLL_INTERVAL`]. Returns `false` if shutdown was requested
/// first; the caller aborts startup cleanly instead of crashing.
pub fn await_ready<S: MetricSource>(source: &S, running: &AtomicBool) -> bool {
    while running.load(Ordering::SeqCst) {
        if source.is_ready() {
            return true;
        }
        sleep_responsive(READY_POLL_INTERVAL, running);
    }
    false
}

/// Sleeps for `duration` in short chunks, returning early once `running`
/// goes false.
fn sleep_responsive(duration: Duration, running: &AtomicBool) {
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(SHUTDOWN_CHECK_INTERVAL);
        thread::sleep(sleep_time);
        remaining = remaining.saturating_sub(sleep_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::MetricFilter;
    use crate::mock::MockSource;
    use crate::pipeline::COLLECTION_TIME_METRIC;

    fn scheduler_with(source: MockSource, path: &Path) -> ExportScheduler<MockSource> {
        let pipeline = CollectionPipeline::new(source, MetricFilter::pass_everything());
        ExportScheduler::new(pipeline, path)
    }

    #[test]
    fn test_run_cycle_writes_exposition_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        let source = MockSource::new();
        source.add_counter("cassandra.reads", 3.0);
        let mut scheduler = scheduler_with(source, &path);

        let report = scheduler.run_cycle().unwrap();
        assert_eq!(report.families, 2); // survivor + timing gauge

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# TYPE cassandra_reads counter"));
        assert!(content.contains("cassandra_reads 3"));
        assert!(content.contains(COLLECTION_TIME_METRIC));
    }

    #[test]
    fn test_output_is_overwritten_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        let source = MockSource::new();
        source.add_counter("cassandra.reads", 3.0);
        let mut scheduler = scheduler_with(source, &path);

        scheduler.run_cycle().unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        scheduler.pipeline.source().remove("cassandra.reads");
        scheduler.run_cycle().unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert!(first.contains("cassandra_reads"));
        assert!(!second.contains("cassandra_reads"));
        assert!(second.len() < first.len());
    }

    #[test]
    fn test_write_failure_is_reported_not_panicking() {
        let source = MockSource::new();
        let mut scheduler =
            scheduler_with(source, Path::new("/nonexistent-dir/metrics.txt"));

        let err = scheduler.run_cycle().unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_await_ready_immediate() {
        let running = AtomicBool::new(true);
        assert!(await_ready(&MockSource::new(), &running));
    }

    #[test]
    fn test_await_ready_aborts_on_shutdown() {
        let running = AtomicBool::new(false);
        assert!(!await_ready(&MockSource::not_ready(), &running));
    }

    #[test]
    fn test_sleep_responsive_returns_early() {
        let running = AtomicBool::new(false);
        let started = Instant::now();
        sleep_responsive(Duration::from_secs(30), &running);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
