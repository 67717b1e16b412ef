//! Entry context for variable resolution and interpolation.

use crate::entry::Entry;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching variable expressions like ${...}
static VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is valid"));

/// Context available while an action runs.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    /// Entry being swept (state before the current action)
    pub entry: &'a Entry,
    /// Current value of the targeted field or key
    pub value: Option<&'a str>,
}

impl<'a> EntryContext<'a> {
    /// Create a new context.
    pub fn new(entry: &'a Entry) -> Self {
        Self { entry, value: None }
    }

    /// Set the value the action is working on.
    pub fn with_value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    /// Resolve a variable expression.
    ///
    /// Supports:
    /// - `${key}` - Citation key
    /// - `${type}` - Entry type
    /// - `${value}` - Current value of the targeted field
    /// - `${field.year}` - Value of another field
    pub fn resolve(&self, expr: &str) -> Option<String> {
        let (head, rest) = match expr.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (expr, None),
        };

        match head {
            "key" => Some(self.entry.key.clone()),
            "type" => Some(self.entry.entry_type.clone()),
            "value" => self.value.map(str::to_string),
            "field" => self.entry.get(rest?).map(str::to_string),
            _ => None,
        }
    }

    /// Interpolate all ${...} variables in a string. Unknown variables
    /// become empty strings.
    pub fn interpolate(&self, template: &str) -> String {
        VAR_REGEX
            .replace_all(template, |caps: &regex::Captures| {
                let var_name = caps[1].trim();
                self.resolve(var_name).unwrap_or_default()
            })
            .to_string()
    }
}
