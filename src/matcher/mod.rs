//! Entry and field matchers.

mod condition;
mod field;

pub use condition::ConditionMatcherImpl;
pub use field::FieldMatcherImpl;

use crate::config::{RuleMatcher, ALL_TYPES};
use crate::entry::Entry;

/// Compiled rule matcher that combines all conditions.
#[derive(Debug)]
pub struct CompiledMatcher {
    /// Entry types (lowercase); empty means every type
    entry_types: Vec<String>,
    /// Field name matcher; `None` means every field
    field: Option<FieldMatcherImpl>,
    /// Conditions on other fields
    conditions: Vec<ConditionMatcherImpl>,
}

impl CompiledMatcher {
    /// Compile a rule matcher from configuration.
    pub fn compile(config: &RuleMatcher) -> Result<Self, MatcherError> {
        let entry_types = if config
            .entry_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(ALL_TYPES))
        {
            vec![]
        } else {
            config.entry_types.iter().map(|t| t.to_lowercase()).collect()
        };

        let field = config
            .field
            .as_ref()
            .map(FieldMatcherImpl::compile)
            .transpose()?;

        let conditions = config
            .when
            .iter()
            .map(ConditionMatcherImpl::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entry_types,
            field,
            conditions,
        })
    }

    /// Check whether the entry is selected by type and conditions.
    pub fn matches_entry(&self, entry: &Entry) -> bool {
        if !self.entry_types.is_empty() && !self.entry_types.iter().any(|t| entry.is_type(t)) {
            return false;
        }

        self.conditions.iter().all(|c| c.matches(entry))
    }

    /// Check whether a field name is targeted.
    pub fn matches_field(&self, name: &str) -> bool {
        self.field.as_ref().map_or(true, |f| f.matches(name))
    }

    /// Names of the entry's fields targeted by this matcher, in order.
    pub fn matching_fields(&self, entry: &Entry) -> Vec<String> {
        entry
            .fields
            .names()
            .filter(|name| self.matches_field(name))
            .map(str::to_string)
            .collect()
    }

    /// The field name matcher, if any.
    pub fn field(&self) -> Option<&FieldMatcherImpl> {
        self.field.as_ref()
    }
}

/// Errors that can occur during matcher compilation.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] glob::PatternError),

    #[error("Field name must not be empty")]
    EmptyFieldName,
}
