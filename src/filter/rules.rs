//! Compiled rule sets.
//!
//! A [`RuleSet`] is the compiled, immutable form of one pattern-list bundle
//! ([`PatternGroup`]). Compilation turns the raw lists into structures that
//! keep per-name matching cost independent of the number of patterns:
//! a hash set for exact matches, tries for prefixes/suffixes, and a single
//! combined regex for `contains` + `regex` patterns.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::filter::config::PatternGroup;
use crate::filter::trie::Trie;

/// Extracts the keyspace value out of a label-form metric name, e.g.
/// `Table.ReadLatency{keyspace="ks1",table="t"}`. Quotes are optional.
static KEYSPACE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"keyspace="?([^,"}]+)"?"#).unwrap());

/// One compiled rule group (the blacklist or the whitelist).
#[derive(Debug)]
pub struct RuleSet {
    exact: HashSet<String>,
    prefixes: Trie,
    suffixes: Trie,
    /// OR of all `contains` patterns (escaped) and `regex` patterns
    /// (verbatim); `None` when both lists are empty.
    combined: Option<Regex>,
    keyspaces: HashSet<String>,
    /// Matches any configured keyspace as a whole dot-delimited segment;
    /// `None` when no keyspaces are configured.
    keyspace_boundary: Option<Regex>,
}

impl RuleSet {
    /// A rule set that matches nothing.
    pub fn empty() -> Self {
        Self {
            exact: HashSet::new(),
            prefixes: Trie::new(),
            suffixes: Trie::new(),
            combined: None,
            keyspaces: HashSet::new(),
            keyspace_boundary: None,
        }
    }

    /// Compiles a pattern group. Fails only if a user-supplied `regex`
    /// pattern does not compile.
    pub fn compile(group: &PatternGroup) -> Result<Self, regex::Error> {
        let exact: HashSet<String> = PatternGroup::cleaned(&group.exact)
            .map(str::to_string)
            .collect();

        let mut prefixes = Trie::new();
        for pattern in PatternGroup::cleaned(&group.starts_with) {
            prefixes.insert(pattern);
        }

        // Suffix patterns go in reversed; queries walk the name back to
        // front (see Trie::has_suffix_of).
        let mut suffixes = Trie::new();
        for pattern in PatternGroup::cleaned(&group.ends_with) {
            let reversed: String = pattern.chars().rev().collect();
            suffixes.insert(&reversed);
        }

        let keyspaces: HashSet<String> = PatternGroup::cleaned(&group.keyspaces)
            .map(str::to_string)
            .collect();

        let keyspace_boundary = if keyspaces.is_empty() {
            None
        } else {
            let mut sorted: Vec<&str> = keyspaces.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            let alternatives: Vec<String> = sorted.iter().map(|ks| regex::escape(ks)).collect();
            Some(Regex::new(&format!(
                r"(^|\.)({})(\.|$)",
                alternatives.join("|")
            ))?)
        };

        // 'contains' patterns are escaped to literals, 'regex' patterns go
        // in verbatim; one compiled pattern serves both modes.
        let mut alternatives: Vec<String> = PatternGroup::cleaned(&group.contains)
            .map(|p| regex::escape(p))
            .collect();
        alternatives.extend(PatternGroup::cleaned(&group.regex).map(str::to_string));

        let combined = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&alternatives.join("|"))?)
        };

        Ok(Self {
            exact,
            prefixes,
            suffixes,
            combined,
            keyspaces,
            keyspace_boundary,
        })
    }

    /// Returns `true` if `name` matches any exact, prefix, suffix,
    /// contains or regex pattern. Cheapest checks run first.
    pub fn matches(&self, name: &str) -> bool {
        if self.exact.contains(name) {
            return true;
        }
        if self.prefixes.has_prefix_of(name) {
            return true;
        }
        if self.suffixes.has_suffix_of(name) {
            return true;
        }
        if let Some(pattern) = &self.combined
            && pattern.is_match(name)
        {
            return true;
        }
        false
    }

    /// Returns `true` if `name` belongs to one of the configured keyspaces.
    ///
    /// Names arrive in two shapes from different subsystems: one embeds a
    /// `keyspace="..."` label fragment, the other encodes hierarchy via
    /// dot-separated segments. Both extractions are tried; the boundary
    /// regex requires a whole segment, so `myks` never matches inside
    /// `myks2.table`.
    pub fn matches_keyspace(&self, name: &str) -> bool {
        if self.keyspaces.is_empty() {
            return false;
        }

        if let Some(captures) = KEYSPACE_LABEL.captures(name)
            && self.keyspaces.contains(&captures[1])
        {
            return true;
        }

        if let Some(boundary) = &self.keyspace_boundary
            && boundary.is_match(name)
        {
            return true;
        }

        false
    }

    /// Returns `true` if all five pattern lists compiled to nothing.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.prefixes.is_empty()
            && self.suffixes.is_empty()
            && self.combined.is_none()
            && self.keyspaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(f: impl FnOnce(&mut PatternGroup)) -> PatternGroup {
        let mut g = PatternGroup::default();
        f(&mut g);
        g
    }

    fn list(items: &[&str]) -> Vec<Option<String>> {
        items.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_exact_match() {
        let rules = RuleSet::compile(&group(|g| g.exact = list(&["jvm.uptime"]))).unwrap();

        assert!(rules.matches("jvm.uptime"));
        assert!(!rules.matches("jvm.uptime.seconds"));
    }

    #[test]
    fn test_prefix_and_suffix_match() {
        let rules = RuleSet::compile(&group(|g| {
            g.starts_with = list(&["jvm."]);
            g.ends_with = list(&[".p999"]);
        }))
        .unwrap();

        assert!(rules.matches("jvm.heap.used"));
        assert!(rules.matches("read.latency.p999"));
        assert!(!rules.matches("cassandra.reads"));
    }

    #[test]
    fn test_contains_is_literal() {
        // A 'contains' pattern with regex metacharacters must match
        // literally, not as a regex.
        let rules = RuleSet::compile(&group(|g| g.contains = list(&["a.b"]))).unwrap();

        assert!(rules.matches("xx.a.b.yy"));
        assert!(!rules.matches("xx.aXb.yy"));
    }

    #[test]
    fn test_regex_is_verbatim() {
        let rules =
            RuleSet::compile(&group(|g| g.regex = list(&["^org\\..*Rate$"]))).unwrap();

        assert!(rules.matches("org.apache.OneMinuteRate"));
        assert!(!rules.matches("com.example.OneMinuteRate"));
    }

    #[test]
    fn test_contains_and_regex_share_one_pattern() {
        let rules = RuleSet::compile(&group(|g| {
            g.contains = list(&["Histogram"]);
            g.regex = list(&["Gauge$"]);
        }))
        .unwrap();

        assert!(rules.matches("read.Histogram.p50"));
        assert!(rules.matches("heap.Gauge"));
        assert!(!rules.matches("heap.Gauge.bytes"));
    }

    #[test]
    fn test_invalid_regex_fails_compile() {
        assert!(RuleSet::compile(&group(|g| g.regex = list(&["("]))).is_err());
    }

    #[test]
    fn test_keyspace_label_form() {
        let rules = RuleSet::compile(&group(|g| g.keyspaces = list(&["ks1"]))).unwrap();

        assert!(rules.matches_keyspace(r#"Table.ReadLatency{keyspace="ks1",table="t"}"#));
        assert!(rules.matches_keyspace("Table.ReadLatency{keyspace=ks1}"));
        assert!(!rules.matches_keyspace(r#"Table.ReadLatency{keyspace="ks2"}"#));
    }

    #[test]
    fn test_keyspace_dot_segment_form() {
        let rules = RuleSet::compile(&group(|g| g.keyspaces = list(&["ks1"]))).unwrap();

        assert!(rules.matches_keyspace("ks1.table.count"));
        assert!(rules.matches_keyspace("org.metrics.ks1.table.count"));
        assert!(rules.matches_keyspace("metrics.ks1"));
        // Whole-segment requirement: no substring matches.
        assert!(!rules.matches_keyspace("myks1.table.count"));
        assert!(!rules.matches_keyspace("ks12.table.count"));
    }

    #[test]
    fn test_keyspace_names_are_escaped_in_boundary_pattern() {
        let rules = RuleSet::compile(&group(|g| g.keyspaces = list(&["k+s"]))).unwrap();

        assert!(rules.matches_keyspace("k+s.table.count"));
        assert!(!rules.matches_keyspace("kks.table.count"));
    }

    #[test]
    fn test_empty_ruleset_matches_nothing() {
        let rules = RuleSet::compile(&PatternGroup::default()).unwrap();

        assert!(rules.is_empty());
        assert!(!rules.matches("anything"));
        assert!(!rules.matches(""));
        assert!(!rules.matches_keyspace("ks1.table.count"));

        assert!(RuleSet::empty().is_empty());
    }

    #[test]
    fn test_nulls_and_empties_dropped() {
        let rules = RuleSet::compile(&group(|g| {
            g.exact = vec![None, Some(String::new())];
            g.starts_with = vec![None];
        }))
        .unwrap();

        assert!(rules.is_empty());
        assert!(!rules.matches(""));
    }
}
