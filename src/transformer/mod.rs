//! Rule actions and their single dispatch point.
//!
//! Actions are a closed set. [`CompiledAction::compile`] validates the
//! configured parameters once, before any entry is seen, and [`apply`]
//! dispatches on the variant for every entry.

mod acronym;
mod author;
mod text;

pub use acronym::{protect_whole, AcronymProtector};
pub use author::{apply_et_al, has_embedded_et_al, split_authors, ET_AL_MARK};
pub use text::{
    brace_depths, is_fully_braced, lowercase_unprotected, strip_whitespace, truncate,
};

use text::{replace_literal, substitute};

use crate::config::{Action, Target};
use crate::context::EntryContext;
use crate::entry::Entry;
use crate::matcher::CompiledMatcher;
use regex::{Regex, RegexBuilder};

/// Action with its patterns compiled.
#[derive(Debug)]
pub enum CompiledAction {
    StripWhitespace,
    Lowercase,
    ProtectAcronyms(AcronymProtector),
    Protect,
    Drop,
    Rename { to: String },
    Truncate { max_chars: usize, ellipsis: String },
    Substitute { regex: Regex, replacement: String },
    Replace { pattern: Regex, to: String },
    Set { value: String, overwrite: bool },
    Require,
}

impl CompiledAction {
    /// Validate and compile an action from configuration.
    pub fn compile(action: &Action) -> Result<Self, ActionError> {
        let compiled = match action {
            Action::StripWhitespace => Self::StripWhitespace,
            Action::Lowercase => Self::Lowercase,
            Action::ProtectAcronyms {
                acronyms,
                detect_all_caps,
            } => {
                if acronyms.iter().all(|a| a.trim().is_empty()) && !detect_all_caps {
                    return Err(ActionError::Invalid(
                        "protect_acronyms needs `acronyms` or `detect_all_caps`".to_string(),
                    ));
                }
                Self::ProtectAcronyms(AcronymProtector::new(acronyms, *detect_all_caps)?)
            }
            Action::Protect => Self::Protect,
            Action::Drop => Self::Drop,
            Action::Rename { to } => {
                if to.trim().is_empty() {
                    return Err(ActionError::Invalid(
                        "rename target must not be empty".to_string(),
                    ));
                }
                Self::Rename {
                    to: to.trim().to_lowercase(),
                }
            }
            Action::Truncate {
                max_chars,
                ellipsis,
            } => {
                if *max_chars == 0 {
                    return Err(ActionError::Invalid(
                        "truncate.max_chars must be greater than zero".to_string(),
                    ));
                }
                Self::Truncate {
                    max_chars: *max_chars,
                    ellipsis: ellipsis.clone().unwrap_or_default(),
                }
            }
            Action::Substitute {
                pattern,
                replacement,
            } => Self::Substitute {
                regex: Regex::new(pattern)?,
                replacement: replacement.clone(),
            },
            Action::Replace { from, to } => {
                if from.is_empty() {
                    return Err(ActionError::Invalid(
                        "replace.from must not be empty".to_string(),
                    ));
                }
                Self::Replace {
                    pattern: RegexBuilder::new(&regex::escape(from))
                        .case_insensitive(true)
                        .build()?,
                    to: to.clone(),
                }
            }
            Action::Set { value, overwrite } => Self::Set {
                value: value.clone(),
                overwrite: *overwrite,
            },
            Action::Require => Self::Require,
        };
        Ok(compiled)
    }

    /// Whether the action can rewrite a citation key.
    pub fn supports_key(&self) -> bool {
        matches!(
            self,
            Self::StripWhitespace
                | Self::Lowercase
                | Self::Truncate { .. }
                | Self::Substitute { .. }
                | Self::Replace { .. }
                | Self::Set { .. }
        )
    }
}

/// What an action did to one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// Targets selected by the matcher
    pub matched: usize,
    /// Targets whose value changed (or were created/removed)
    pub changed: usize,
}

/// Apply an action to an entry. This is the only dispatch point.
pub fn apply(
    action: &CompiledAction,
    target: Target,
    matcher: &CompiledMatcher,
    entry: &mut Entry,
) -> Result<Applied, TransformError> {
    match target {
        Target::Key => apply_to_key(action, entry),
        Target::Fields => apply_to_fields(action, matcher, entry),
    }
}

fn apply_to_key(action: &CompiledAction, entry: &mut Entry) -> Result<Applied, TransformError> {
    let rewritten = {
        let ctx = EntryContext::new(entry).with_value(&entry.key);
        transform_text(action, &ctx, &entry.key)
    };

    let Some(key) = rewritten else {
        return Ok(Applied {
            matched: 1,
            changed: 0,
        });
    };
    if key.trim().is_empty() {
        return Err(TransformError::EmptyKey);
    }
    entry.key = key;

    Ok(Applied {
        matched: 1,
        changed: 1,
    })
}

fn apply_to_fields(
    action: &CompiledAction,
    matcher: &CompiledMatcher,
    entry: &mut Entry,
) -> Result<Applied, TransformError> {
    let names = matcher.matching_fields(entry);
    let mut applied = Applied {
        matched: names.len(),
        changed: 0,
    };

    match action {
        CompiledAction::Require => {
            if names.is_empty() {
                let wanted = matcher
                    .field()
                    .map_or_else(|| "any field".to_string(), |f| f.describe().to_string());
                return Err(TransformError::MissingField(wanted));
            }
        }
        CompiledAction::Drop => {
            for name in &names {
                entry.fields.remove(name);
            }
            applied.changed = names.len();
        }
        CompiledAction::Rename { to } => {
            for name in names.iter().filter(|n| *n != to) {
                if entry.fields.rename(name, to) {
                    applied.changed += 1;
                }
            }
        }
        CompiledAction::Set { value, overwrite } => {
            if names.is_empty() {
                // Only an exact field pattern names a field to create.
                if let Some(name) = matcher.field().and_then(|f| f.exact_name()) {
                    let rendered = EntryContext::new(entry).interpolate(value);
                    entry.fields.insert(name, rendered);
                    applied.changed = 1;
                }
            } else if *overwrite {
                applied.changed = rewrite_fields(action, &names, entry);
            }
        }
        _ => {
            applied.changed = rewrite_fields(action, &names, entry);
        }
    }

    Ok(applied)
}

/// Run a text action over the named fields; returns how many changed.
fn rewrite_fields(action: &CompiledAction, names: &[String], entry: &mut Entry) -> usize {
    let mut changed = 0;

    for name in names {
        let rewritten = {
            let Some(current) = entry.get(name) else {
                continue;
            };
            let ctx = EntryContext::new(entry).with_value(current);
            transform_text(action, &ctx, current)
        };
        if let Some(value) = rewritten {
            entry.fields.insert(name, value);
            changed += 1;
        }
    }

    changed
}

/// Text rewrite for one value; `None` when the value stays the same.
fn transform_text(action: &CompiledAction, ctx: &EntryContext<'_>, text: &str) -> Option<String> {
    let rewritten = match action {
        CompiledAction::StripWhitespace => Some(strip_whitespace(text)),
        CompiledAction::Lowercase => Some(lowercase_unprotected(text)),
        CompiledAction::ProtectAcronyms(protector) => protector.protect(text),
        CompiledAction::Protect => protect_whole(text),
        CompiledAction::Truncate {
            max_chars,
            ellipsis,
        } => truncate(text, *max_chars, ellipsis),
        CompiledAction::Substitute { regex, replacement } => substitute(text, regex, replacement),
        CompiledAction::Replace { pattern, to } => replace_literal(text, pattern, to),
        CompiledAction::Set { value, .. } => Some(ctx.interpolate(value)),
        CompiledAction::Drop | CompiledAction::Rename { .. } | CompiledAction::Require => None,
    };

    rewritten.filter(|new| new != text)
}

/// Errors in action parameters, caught before processing.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Per-entry action failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("no field matched")]
    NoMatchingField,

    #[error("citation key would become empty")]
    EmptyKey,
}
