//! Character trie for prefix and suffix pattern matching.
//!
//! Metric names are checked against potentially hundreds of configured
//! prefixes/suffixes on every scrape, so matching must not scale with the
//! number of stored patterns. A trie answers "does any stored pattern
//! prefix this text" in O(|text|).

use std::collections::HashMap;

/// A character-keyed trie storing a set of patterns.
///
/// Suffix matching reuses the same structure: insert each pattern reversed
/// and query with [`Trie::has_suffix_of`], which walks the text back to
/// front instead of allocating a reversed copy per query.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    end_of_pattern: bool,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pattern into the trie.
    pub fn insert(&mut self, pattern: &str) {
        let mut current = &mut self.root;
        for ch in pattern.chars() {
            current = current.children.entry(ch).or_default();
        }
        current.end_of_pattern = true;
    }

    /// Returns `true` if some inserted pattern is a prefix of `text`.
    ///
    /// This is a prefix relationship, not length equality: the walk stops
    /// with a match as soon as it reaches an end-of-pattern node, even if
    /// `text` continues past it.
    pub fn has_prefix_of(&self, text: &str) -> bool {
        self.walk(text.chars())
    }

    /// Returns `true` if some pattern inserted *reversed* is a suffix of
    /// `text`. Walks the text back to front against the reversed patterns.
    pub fn has_suffix_of(&self, text: &str) -> bool {
        self.walk(text.chars().rev())
    }

    /// Returns `true` if the trie holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    fn walk(&self, chars: impl Iterator<Item = char>) -> bool {
        let mut current = &self.root;
        for ch in chars {
            let Some(node) = current.children.get(&ch) else {
                return false;
            };
            if node.end_of_pattern {
                return true;
            }
            current = node;
        }
        // Text exhausted without reaching an end-of-pattern node:
        // every stored pattern is longer than the text.
        false
    }
}
