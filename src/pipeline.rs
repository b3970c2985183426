//! The per-cycle collection pipeline.
//!
//! Each cycle snapshots the source registry, fans the name filtering out
//! across the rayon worker pool, re-registers survivors into the reusable
//! scratch registry, converts them to exposition families, strips
//! zero-valued samples and appends the pipeline's own timing gauge.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::expose::{self, MetricFamily, MetricKind, Sample};
use crate::filter::MetricFilter;
use crate::registry::{MetricSource, ScratchRegistry};

/// Name of the self-timing gauge appended to every cycle's output.
pub const COLLECTION_TIME_METRIC: &str = "promsift_collection_time_in_ms";

const COLLECTION_TIME_HELP: &str = "Time taken in milliseconds to collect and filter metrics.";

/// Drives one snapshot → filter → convert → emit cycle.
///
/// The filter and the scratch registry are the only state shared with the
/// parallel workers; the filter is immutable and the registry supports
/// concurrent registration, so the fan-out needs no extra locking.
pub struct CollectionPipeline<S: MetricSource> {
    source: S,
    filter: MetricFilter,
    scratch: ScratchRegistry,
    last_collection_ms: f64,
}

impl<S: MetricSource> CollectionPipeline<S> {
    pub fn new(source: S, filter: MetricFilter) -> Self {
        Self {
            source,
            filter,
            scratch: ScratchRegistry::new(),
            last_collection_ms: 0.0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Wall-clock cost in milliseconds of the last cycle's snapshot and
    /// filtering steps.
    pub fn last_collection_ms(&self) -> f64 {
        self.last_collection_ms
    }

    /// Runs one collection cycle and returns the resulting metric
    /// families, sorted by name, with the timing gauge appended last.
    pub fn collect(&mut self) -> Vec<MetricFamily> {
        let start = Instant::now();

        // The scratch registry is reused across cycles; survivors from the
        // previous cycle must not leak into this one.
        self.scratch.clear();

        // A None snapshot means "no metrics this cycle", not an error.
        if let Some(snapshot) = self.source.snapshot() {
            let filter = &self.filter;
            let scratch = &self.scratch;
            snapshot.into_par_iter().for_each(|(name, value)| {
                if filter.should_include(&name) {
                    scratch.register(&name, value);
                }
            });
        }

        // Timing covers clear + snapshot + filter, independent of the
        // value-level filtering below.
        self.last_collection_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut families: Vec<MetricFamily> = self
            .scratch
            .sorted_entries()
            .iter()
            .map(|(name, value)| expose::to_family(name, value))
            .filter_map(strip_zero_samples)
            .collect();

        debug!(
            "Cycle: {} survivors, {} families after zero suppression, {:.1} ms",
            self.scratch.len(),
            families.len(),
            self.last_collection_ms
        );

        // The timing gauge is operational health data: always emitted,
        // even at 0 ms.
        families.push(self.timing_family());
        families
    }

    fn timing_family(&self) -> MetricFamily {
        MetricFamily {
            name: COLLECTION_TIME_METRIC.to_string(),
            kind: MetricKind::Gauge,
            help: COLLECTION_TIME_HELP.to_string(),
            samples: vec![Sample::new(
                COLLECTION_TIME_METRIC,
                Vec::new(),
                self.last_collection_ms,
            )],
        }
    }
}

/// Drops samples whose value is exactly 0.0; drops the family entirely if
/// nothing remains. Zero-valued samples carry no operational signal.
fn strip_zero_samples(mut family: MetricFamily) -> Option<MetricFamily> {
    family.samples.retain(|s| s.value != 0.0);
    if family.samples.is_empty() {
        None
    } else {
        Some(family)
    }
}
