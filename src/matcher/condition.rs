//! Field value conditions.

use super::MatcherError;
use crate::config::FieldCondition;
use crate::entry::Entry;
use regex::Regex;

/// Compiled field condition.
#[derive(Debug)]
pub struct ConditionMatcherImpl {
    /// Field name (lowercase)
    name: String,
    /// Match condition
    condition: Condition,
}

#[derive(Debug)]
enum Condition {
    /// Exact value match
    Equals(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Matches(Regex),
    /// Field must be present
    Present,
    /// Field must be absent
    Absent,
}

impl ConditionMatcherImpl {
    /// Compile a field condition from configuration.
    pub fn compile(config: &FieldCondition) -> Result<Self, MatcherError> {
        let name = config.name.to_lowercase();
        if name.trim().is_empty() {
            return Err(MatcherError::EmptyFieldName);
        }

        let condition = if let Some(ref value) = config.equals {
            Condition::Equals(value.clone())
        } else if let Some(ref substr) = config.contains {
            Condition::Contains(substr.clone())
        } else if let Some(ref pattern) = config.matches {
            Condition::Matches(Regex::new(pattern)?)
        } else if config.absent == Some(true) || config.present == Some(false) {
            Condition::Absent
        } else {
            // Default to presence check
            Condition::Present
        };

        Ok(Self { name, condition })
    }

    /// Check the condition against an entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        let value = entry.get(&self.name);

        match &self.condition {
            Condition::Equals(expected) => value.is_some_and(|v| v == expected),
            Condition::Contains(substr) => value.is_some_and(|v| v.contains(substr.as_str())),
            Condition::Matches(regex) => value.is_some_and(|v| regex.is_match(v)),
            Condition::Present => value.is_some(),
            Condition::Absent => value.is_none(),
        }
    }
}
