//! Metric source abstraction and the scratch registry.
//!
//! The live registry of the host process is reached through the
//! [`MetricSource`] trait, so the pipeline can run against a real
//! attachment in production and a [`crate::mock::MockSource`] in tests,
//! the same way the collector swaps filesystems behind a trait seam.

use std::collections::HashMap;
use std::sync::RwLock;

/// A point-in-time value read from the source registry.
///
/// Handles are cheap to clone; the pipeline copies survivors into the
/// scratch registry on every cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Monotonic count.
    Counter(f64),
    /// Instantaneous value.
    Gauge(f64),
    /// Pre-aggregated distribution with fixed quantiles.
    Histogram {
        count: u64,
        sum: f64,
        p50: f64,
        p95: f64,
        p99: f64,
    },
}

/// A live metric registry to harvest from.
///
/// Implementations must tolerate concurrent mutation of the underlying
/// registry: the snapshot is a best-effort, point-in-time view, not a
/// transactional one.
pub trait MetricSource {
    /// Returns `true` once the underlying registry exists and can be read.
    fn is_ready(&self) -> bool;

    /// Takes a snapshot of the current name→value mapping.
    ///
    /// `None` means the registry produced nothing this cycle; the caller
    /// treats it as "no metrics", not as an error.
    fn snapshot(&self) -> Option<HashMap<String, MetricValue>>;
}

/// The reusable registry of filter survivors.
///
/// Cleared at the start of every cycle and repopulated by the parallel
/// filtering workers, so it supports concurrent insertion and an atomic
/// bulk clear. Reused across cycles to avoid reallocation churn.
#[derive(Debug, Default)]
pub struct ScratchRegistry {
    entries: RwLock<HashMap<String, MetricValue>>,
}

impl ScratchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all entries, keeping the allocation.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Registers a metric. Safe to call from multiple workers at once;
    /// a later registration under the same name replaces the earlier one.
    pub fn register(&self, name: &str, value: MetricValue) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value);
    }

    /// Returns the current contents sorted by name.
    pub fn sorted_entries(&self) -> Vec<(String, MetricValue)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<(String, MetricValue)> =
            entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
