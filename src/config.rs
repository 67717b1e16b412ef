//! Configuration types for the sweeper.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Entry type key that applies a per-type setting to every entry.
pub const ALL_TYPES: &str = "all";

/// Main configuration for a sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Configuration version
    pub version: String,
    /// Global settings
    pub settings: Settings,
    /// Rules (applied in declaration order)
    pub rules: Vec<Rule>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: Settings::default(),
            rules: vec![],
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Canonical entry type -> alias types rewritten to it
    pub type_aliases: IndexMap<String, Vec<String>>,
    /// Fold `optX` fields into `X`
    pub expand_opt_fields: bool,
    /// Entry type (or `all`) -> fields kept in the output
    pub allow_fields: IndexMap<String, Vec<String>>,
    /// Fields always dropped
    pub deny_fields: Vec<String>,
    /// Entry type (or `all`) -> mandatory fields
    pub required: IndexMap<String, Vec<Requirement>>,
    /// What to do with entries missing a mandatory field
    pub missing_required: Severity,
    /// What to do with entries whose key repeats an earlier one
    pub duplicate_keys: Severity,
    /// Lint checks
    pub checks: ChecksConfig,
    /// Author list truncation
    pub et_al: EtAlConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            type_aliases: IndexMap::new(),
            expand_opt_fields: true,
            allow_fields: IndexMap::new(),
            deny_fields: vec![],
            required: IndexMap::new(),
            missing_required: Severity::Warn,
            duplicate_keys: Severity::Warn,
            checks: ChecksConfig::default(),
            et_al: EtAlConfig::default(),
        }
    }
}

/// A mandatory field, or a group of alternatives of which one must exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Requirement {
    Field(String),
    AnyOf(Vec<String>),
}

impl Requirement {
    /// Field names that satisfy this requirement.
    pub fn alternatives(&self) -> &[String] {
        match self {
            Self::Field(name) => std::slice::from_ref(name),
            Self::AnyOf(names) => names,
        }
    }
}

/// How a failure is handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Record a warning and keep the entry
    #[default]
    Warn,
    /// Record a warning and drop the entry from the output
    Exclude,
}

/// Lint checks run after the rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Warn when "et al." is written into the author list
    pub et_al_in_author: bool,
    /// Warn when a booktitle carries a year
    pub year_in_booktitle: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            et_al_in_author: true,
            year_in_booktitle: true,
        }
    }
}

/// Author list truncation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EtAlConfig {
    /// Maximum number of authors kept verbatim (0 disables truncation)
    pub threshold: usize,
    /// Keep only the first author when truncating (IEEE style)
    pub ieee_mode: bool,
}

/// A sweep rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name (for logging/warnings)
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: String,
    /// Whether the rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// What the action operates on
    #[serde(default)]
    pub target: Target,
    /// Matching conditions
    #[serde(rename = "match", default)]
    pub matcher: RuleMatcher,
    /// The transformation (`{ name: { params } }` in YAML and JSON alike)
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub action: Action,
    /// Policy when the action fails
    #[serde(default)]
    pub on_failure: Severity,
    /// Treat "no field matched" as a failure
    #[serde(default)]
    pub must_match: bool,
}

fn default_true() -> bool {
    true
}

/// What a rule's action is applied to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Every field whose name matches
    #[default]
    Fields,
    /// The citation key
    Key,
}

/// Matching conditions for a rule.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuleMatcher {
    /// Entry types the rule applies to (empty or `all` = every type)
    #[serde(default)]
    pub entry_types: Vec<String>,
    /// Field name matching (absent = every field)
    #[serde(default)]
    pub field: Option<FieldPattern>,
    /// Conditions on other fields of the entry
    #[serde(default)]
    pub when: Vec<FieldCondition>,
}

/// Field name pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPattern {
    /// The pattern to match
    pub pattern: String,
    /// Match type: exact, glob, regex
    #[serde(default, rename = "type")]
    pub pattern_type: PatternType,
}

/// Pattern matching type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Exact name (case-insensitive)
    #[default]
    Exact,
    /// Glob pattern (*, ?)
    Glob,
    /// Regular expression
    Regex,
}

/// Condition on a field value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Field name (case-insensitive)
    pub name: String,
    /// Exact value match
    #[serde(default)]
    pub equals: Option<String>,
    /// Contains substring
    #[serde(default)]
    pub contains: Option<String>,
    /// Regex match
    #[serde(default)]
    pub matches: Option<String>,
    /// Field must be present
    #[serde(default)]
    pub present: Option<bool>,
    /// Field must be absent
    #[serde(default)]
    pub absent: Option<bool>,
}

/// Rule action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Trim and collapse whitespace
    StripWhitespace,
    /// Lower-case text outside brace groups
    Lowercase,
    /// Brace-protect acronyms
    ProtectAcronyms {
        #[serde(default)]
        acronyms: Vec<String>,
        #[serde(default)]
        detect_all_caps: bool,
    },
    /// Brace-protect the whole value
    Protect,
    /// Remove the field
    Drop,
    /// Rename the field
    Rename { to: String },
    /// Cut the value to a maximum number of characters
    Truncate {
        max_chars: usize,
        #[serde(default)]
        ellipsis: Option<String>,
    },
    /// Regex substitution
    Substitute { pattern: String, replacement: String },
    /// Case-insensitive literal replacement
    Replace { from: String, to: String },
    /// Set a value from a template
    Set {
        value: String,
        #[serde(default = "default_true")]
        overwrite: bool,
    },
    /// Fail when no field matches
    Require,
}

impl Action {
    /// Action name as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StripWhitespace => "strip_whitespace",
            Self::Lowercase => "lowercase",
            Self::ProtectAcronyms { .. } => "protect_acronyms",
            Self::Protect => "protect",
            Self::Drop => "drop",
            Self::Rename { .. } => "rename",
            Self::Truncate { .. } => "truncate",
            Self::Substitute { .. } => "substitute",
            Self::Replace { .. } => "replace",
            Self::Set { .. } => "set",
            Self::Require => "require",
        }
    }
}
