//! promsift — filtered metric harvesting to a flat exposition file.
//!
//! Periodically snapshots a large, dynamically-changing registry of named
//! metrics, cuts volume and cardinality through a compiled include/exclude
//! rule set, and overwrites a text-exposition file on a fixed-delay
//! schedule.
//!
//! Provides:
//! - `filter` — rule compilation and matching (trie, combined regex,
//!   keyspace extraction) and the inclusion policy
//! - `registry` — metric source trait, metric values, scratch registry
//! - `expose` — exposition families and the text writer
//! - `pipeline` — the per-cycle snapshot → filter → convert → emit loop
//! - `export` — fixed-delay scheduling, readiness wait, file sink
//! - `mock` — canned metric sources for tests and simulation
//!
//! The attachment to a real host-process registry is deliberately behind
//! the [`registry::MetricSource`] trait; embedders implement it and hand
//! the source to [`pipeline::CollectionPipeline`].

pub mod expose;
pub mod export;
pub mod filter;
pub mod mock;
pub mod pipeline;
pub mod registry;
