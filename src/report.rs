//! Sweep results and warnings.

use crate::entry::Entry;
use std::fmt;

/// A non-fatal problem found while sweeping one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Citation key of the entry
    pub key: String,
    /// Rule that raised the warning, if any
    pub rule: Option<String>,
    /// What went wrong
    pub message: String,
}

impl Warning {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rule: None,
            message: message.into(),
        }
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "entry {}: {} (rule `{}`)", self.key, self.message, rule),
            None => write!(f, "entry {}: {}", self.key, self.message),
        }
    }
}

/// Result of sweeping one entry.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    /// The entry after every step that ran
    pub entry: Entry,
    /// Whether a failure policy dropped the entry
    pub excluded: bool,
    /// Warnings raised for this entry
    pub warnings: Vec<Warning>,
}

/// Result of a whole sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Surviving entries in input order
    pub entries: Vec<Entry>,
    /// All warnings in the order they were raised
    pub warnings: Vec<Warning>,
    /// Keys of the entries that were dropped
    pub excluded: Vec<String>,
}

impl SweepReport {
    /// Warnings raised for one citation key.
    pub fn warnings_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.key == key)
    }

    /// Whether the sweep finished without any warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
