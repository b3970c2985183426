//! Mock metric source for testing and simulation.
//!
//! Provides canned registry states so the whole pipeline can run without
//! attaching to a real process (unit tests, and the daemon's `--simulate`
//! mode).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::registry::{MetricSource, MetricValue};

/// An in-memory [`MetricSource`] with settable readiness and contents.
#[derive(Debug, Default)]
pub struct MockSource {
    ready: bool,
    metrics: Mutex<HashMap<String, MetricValue>>,
}

impl MockSource {
    /// An empty, ready source.
    pub fn new() -> Self {
        Self {
            ready: true,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// A source that never becomes ready.
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Adds or replaces a metric.
    pub fn add(&self, name: &str, value: MetricValue) {
        self.metrics
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }

    pub fn add_gauge(&self, name: &str, value: f64) {
        self.add(name, MetricValue::Gauge(value));
    }

    pub fn add_counter(&self, name: &str, value: f64) {
        self.add(name, MetricValue::Counter(value));
    }

    /// Removes a metric, as if it disappeared from the live registry.
    pub fn remove(&self, name: &str) {
        self.metrics.lock().unwrap().remove(name);
    }

    /// Creates a registry shaped like a typical running JVM storage node:
    /// dot-hierarchy names, label-form keyspace names, and a mix of
    /// counters, gauges and histograms.
    pub fn typical_process() -> Self {
        let source = Self::new();

        source.add_gauge("jvm.memory.heap.used", 1_234_567_890.0);
        source.add_gauge("jvm.memory.heap.max", 8_589_934_592.0);
        source.add_counter("jvm.gc.G1-Young-Generation.count", 42.0);
        source.add_counter("jvm.gc.G1-Young-Generation.time", 1850.0);
        source.add_gauge("jvm.threads.count", 187.0);
        source.add_gauge("jvm.threads.deadlocked.count", 0.0);

        source.add_counter("org.apache.cassandra.metrics.ClientRequest.Read.Latency.count", 99_182.0);
        source.add_counter("org.apache.cassandra.metrics.ClientRequest.Write.Latency.count", 48_310.0);
        source.add_counter("org.apache.cassandra.metrics.ClientRequest.Read.Failures.count", 0.0);
        source.add_gauge("org.apache.cassandra.metrics.Storage.Load", 52_428_800.0);
        source.add_gauge("org.apache.cassandra.metrics.Cache.KeyCache.HitRate", 0.93);

        source.add(
            "org.apache.cassandra.metrics.Table.ReadLatency{keyspace=\"app_data\",table=\"events\"}",
            MetricValue::Histogram {
                count: 88_412,
                sum: 120_334.5,
                p50: 0.8,
                p95: 2.4,
                p99: 7.9,
            },
        );
        source.add(
            "org.apache.cassandra.metrics.Table.WriteLatency{keyspace=\"app_data\",table=\"events\"}",
            MetricValue::Histogram {
                count: 44_102,
                sum: 30_551.2,
                p50: 0.3,
                p95: 1.1,
                p99: 3.2,
            },
        );
        source.add_counter("system_traces.events.ReadCount", 12.0);
        source.add_counter("system_traces.sessions.WriteCount", 7.0);

        source
    }
}

impl MetricSource for MockSource {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn snapshot(&self) -> Option<HashMap<String, MetricValue>> {
        Some(self.metrics.lock().unwrap().clone())
    }
}
