//! Metric-name filtering.
//!
//! Classifies every scraped metric name against the configured rule groups
//! and decides whether it survives into the exported output.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     MetricFilter                     │
//! │   ┌────────────────────┐  ┌───────────────────────┐  │
//! │   │  blacklist RuleSet │  │  whitelist RuleSet    │  │
//! │   │  (always present)  │  │  (optional)           │  │
//! │   └─────────┬──────────┘  └──────────┬────────────┘  │
//! │             │   exact set / tries /  │               │
//! │             │   combined regex /     │               │
//! │             │   keyspace boundary    │               │
//! └─────────────┴────────────────────────┴───────────────┘
//! ```
//!
//! Rule sets are immutable after construction, so [`MetricFilter`] is
//! freely shared across the parallel filtering workers without locking.

pub mod config;
pub mod rules;
pub mod trie;

use std::path::Path;

use tracing::warn;

pub use config::{ConfigError, PatternGroup, RuleConfig, load_rules, load_rules_or_default};
pub use rules::RuleSet;
pub use trie::Trie;

/// The inclusion decision for metric names.
///
/// Strict two-tier policy: the blacklist always wins; the whitelist, when
/// configured, is the sole positive gate and only narrows further.
#[derive(Debug)]
pub struct MetricFilter {
    blacklist: RuleSet,
    whitelist: Option<RuleSet>,
}

impl MetricFilter {
    /// Compiles a filter from a loaded rule configuration.
    ///
    /// An absent group compiles to an empty rule set; a whitelist that
    /// compiles to empty is treated as not configured.
    pub fn from_config(config: &RuleConfig) -> Result<Self, regex::Error> {
        let blacklist = match &config.blacklist {
            Some(group) => RuleSet::compile(group)?,
            None => RuleSet::empty(),
        };
        let whitelist = match &config.whitelist {
            Some(group) => Some(RuleSet::compile(group)?).filter(|r| !r.is_empty()),
            None => None,
        };
        Ok(Self {
            blacklist,
            whitelist,
        })
    }

    /// Loads and compiles a filter from a rule file, degrading to a
    /// pass-everything filter on any load or compile failure.
    pub fn from_path(path: &Path) -> Self {
        let config = load_rules_or_default(path);
        match Self::from_config(&config) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(
                    "Could not compile filter rules from {}: {}. No filtering will be applied",
                    path.display(),
                    e
                );
                Self::pass_everything()
            }
        }
    }

    /// A filter with no rules: everything is included.
    pub fn pass_everything() -> Self {
        Self {
            blacklist: RuleSet::empty(),
            whitelist: None,
        }
    }

    /// Decides whether a metric name survives filtering.
    pub fn should_include(&self, name: &str) -> bool {
        // Keyspace exclusion is the most specific rule; fail fast on it.
        if self.blacklist.matches_keyspace(name) {
            return false;
        }
        if self.blacklist.matches(name) {
            return false;
        }

        // With a whitelist configured, nothing passes unless listed.
        if let Some(whitelist) = &self.whitelist {
            return whitelist.matches(name);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<Option<String>> {
        items.iter().map(|s| Some(s.to_string())).collect()
    }

    fn filter(
        blacklist: Option<PatternGroup>,
        whitelist: Option<PatternGroup>,
    ) -> MetricFilter {
        MetricFilter::from_config(&RuleConfig {
            blacklist,
            whitelist,
        })
        .unwrap()
    }

    #[test]
    fn test_no_rules_includes_everything() {
        let f = filter(None, None);
        assert!(f.should_include("anything.at.all"));
        assert!(f.should_include(""));
    }

    #[test]
    fn test_blacklist_excludes() {
        let mut blacklist = PatternGroup::default();
        blacklist.starts_with = list(&["jvm."]);
        let f = filter(Some(blacklist), None);

        assert!(!f.should_include("jvm.heap.used"));
        assert!(f.should_include("cassandra.reads"));
    }

    #[test]
    fn test_blacklist_always_wins() {
        let mut blacklist = PatternGroup::default();
        blacklist.contains = list(&["ReadLatency"]);
        let mut whitelist = PatternGroup::default();
        whitelist.contains = list(&["ReadLatency"]);
        let f = filter(Some(blacklist), Some(whitelist));

        assert!(!f.should_include("Table.ReadLatency.p99"));
    }

    #[test]
    fn test_whitelist_narrows_never_widens() {
        let mut whitelist = PatternGroup::default();
        whitelist.starts_with = list(&["cassandra."]);
        let f = filter(None, Some(whitelist));

        assert!(f.should_include("cassandra.reads"));
        // Not blacklisted, but not whitelisted either.
        assert!(!f.should_include("jvm.heap.used"));
    }

    #[test]
    fn test_empty_whitelist_is_not_a_gate() {
        let f = filter(None, Some(PatternGroup::default()));
        assert!(f.should_include("anything"));
    }

    #[test]
    fn test_keyspace_exclusion_checked_first() {
        let mut blacklist = PatternGroup::default();
        blacklist.keyspaces = list(&["ks1"]);
        let mut whitelist = PatternGroup::default();
        whitelist.contains = list(&["ks1"]);
        let f = filter(Some(blacklist), Some(whitelist));

        assert!(!f.should_include(r#"Table.ReadLatency{keyspace="ks1"}"#));
        assert!(!f.should_include("ks1.table.count"));
    }

    #[test]
    fn test_keyspace_whole_segment_requirement() {
        let mut blacklist = PatternGroup::default();
        blacklist.keyspaces = list(&["ks1"]);
        let f = filter(Some(blacklist), None);

        assert!(!f.should_include("ks1.table.count"));
        assert!(f.should_include("myks1.table.count"));
        assert!(f.should_include(r#"foo{keyspace="ks2"}"#));
    }

    #[test]
    fn test_idempotent() {
        let mut blacklist = PatternGroup::default();
        blacklist.starts_with = list(&["jvm."]);
        let f = filter(Some(blacklist), None);

        for name in ["jvm.gc.count", "cassandra.reads"] {
            assert_eq!(f.should_include(name), f.should_include(name));
        }
    }

    #[test]
    fn test_from_path_missing_file_passes_everything() {
        let f = MetricFilter::from_path(Path::new("/nonexistent/rules.json"));
        assert!(f.should_include("anything"));
    }

    #[test]
    fn test_from_path_bad_regex_passes_everything() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"blacklist": {"regex": ["("]}}"#).unwrap();

        let f = MetricFilter::from_path(file.path());
        assert!(f.should_include("anything"));
    }
}
