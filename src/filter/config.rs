//! Rule-config file model and loader.
//!
//! The rule file is a JSON document mapping `"blacklist"` / `"whitelist"`
//! to a bundle of pattern lists:
//!
//! ```json
//! {
//!   "blacklist": {
//!     "startsWith": ["jvm."],
//!     "keyspaces": ["system_traces"]
//!   },
//!   "whitelist": {
//!     "contains": ["ReadLatency"]
//!   }
//! }
//! ```
//!
//! A missing file or a parse failure is never fatal: the loader logs a
//! warning and returns an empty config, which filters nothing.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

/// One pattern-list bundle, keyed by match mode.
///
/// Array entries may be `null` (tolerated, dropped at compile time), so
/// every list is a `Vec<Option<String>>`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternGroup {
    pub exact: Vec<Option<String>>,
    pub starts_with: Vec<Option<String>>,
    pub ends_with: Vec<Option<String>>,
    pub contains: Vec<Option<String>>,
    pub regex: Vec<Option<String>>,
    pub keyspaces: Vec<Option<String>>,
}

impl PatternGroup {
    /// Returns the non-null, non-empty entries of one list.
    pub(crate) fn cleaned(list: &[Option<String>]) -> impl Iterator<Item = &str> {
        list.iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// The full rule configuration: exactly two rule groups, referenced by
/// name throughout. An absent group behaves as an empty rule set.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub blacklist: Option<PatternGroup>,
    pub whitelist: Option<PatternGroup>,
}

/// Failure to read or parse a rule-config file.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading the file.
    Io(std::io::Error),
    /// Malformed JSON or unexpected structure.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reads and parses a rule-config file.
pub fn load_rules(path: &Path) -> Result<RuleConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    serde_json::from_str(&content).map_err(ConfigError::Parse)
}

/// Reads a rule-config file, falling back to an empty (pass-everything)
/// configuration on any failure.
pub fn load_rules_or_default(path: &Path) -> RuleConfig {
    match load_rules(path) {
        Ok(config) => {
            info!("Loaded filter rules from {}", path.display());
            config
        }
        Err(e) => {
            warn!(
                "Could not load filter rules from {}: {}. No filtering will be applied",
                path.display(),
                e
            );
            RuleConfig::default()
        }
    }
}
