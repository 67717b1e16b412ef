//! Sweeper facade: configuration plus compiled rule engine.

use crate::config::{Rule, SweepConfig};
use crate::entry::Entry;
use crate::report::SweepReport;
use crate::rule::{RuleEngine, RuleError};
use indexmap::IndexSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cleans bibliographies according to a validated configuration.
///
/// The configuration is compiled once in [`Sweeper::new`] and never
/// changes afterwards.
#[derive(Debug)]
pub struct Sweeper {
    config: SweepConfig,
    engine: RuleEngine,
}

impl Sweeper {
    /// Validate and compile a configuration.
    pub fn new(config: SweepConfig) -> Result<Self, RuleError> {
        let engine = RuleEngine::new(&config)?;

        info!(
            rules = engine.rules().len(),
            version = %config.version,
            "Sweeper initialized"
        );

        Ok(Self { config, engine })
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SweeperError> {
        let config: SweepConfig = serde_yaml::from_str(yaml)?;
        Self::new(config).map_err(SweeperError::from)
    }

    /// Create from a JSON configuration string.
    ///
    /// A rule that fails to parse is reported by position and name.
    pub fn from_json(json: &str) -> Result<Self, SweeperError> {
        let config: SweepConfig =
            serde_json::from_str(json).map_err(|e| locate_json_rule(json, e))?;
        Self::new(config).map_err(SweeperError::from)
    }

    /// Load a configuration file: YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self, SweeperError> {
        let content = fs::read_to_string(path).map_err(|source| SweeperError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loading configuration");

        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// The configuration this sweeper was built from.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// The compiled rule engine.
    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Sweep a whole bibliography.
    pub fn sweep(&self, entries: Vec<Entry>) -> SweepReport {
        self.engine.sweep(entries)
    }

    /// Sweep only the entries whose key is in `cited`. Keys are compared
    /// without case.
    pub fn sweep_cited(&self, entries: Vec<Entry>, cited: &IndexSet<String>) -> SweepReport {
        let cited: IndexSet<String> = cited.iter().map(|k| k.to_lowercase()).collect();
        let total = entries.len();
        let entries: Vec<Entry> = entries
            .into_iter()
            .filter(|e| cited.contains(&e.key.to_lowercase()))
            .collect();

        info!(
            cited = cited.len(),
            kept = entries.len(),
            skipped = total - entries.len(),
            "Filtered entries by citation"
        );

        self.engine.sweep(entries)
    }
}

/// Narrow a JSON parse error down to the first rule that does not parse.
fn locate_json_rule(json: &str, error: serde_json::Error) -> SweeperError {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
        return SweeperError::Json(error);
    };
    let Some(rules) = value.get("rules").and_then(|r| r.as_array()) else {
        return SweeperError::Json(error);
    };

    for (index, rule) in rules.iter().enumerate() {
        if let Err(source) = serde_json::from_value::<Rule>(rule.clone()) {
            let name = rule
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            return SweeperError::JsonRule {
                index,
                name,
                source,
            };
        }
    }

    SweeperError::Json(error)
}

/// Errors while building a sweeper.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON parse error in rules[{index}] (`{name}`): {source}")]
    JsonRule {
        index: usize,
        name: String,
        source: serde_json::Error,
    },

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
