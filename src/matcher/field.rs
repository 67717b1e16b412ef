//! Field name matching implementation.

use super::MatcherError;
use crate::config::{FieldPattern, PatternType};
use glob::{MatchOptions, Pattern as GlobPattern};
use regex::{Regex, RegexBuilder};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled field name matcher. All variants ignore case.
#[derive(Debug)]
pub enum FieldMatcherImpl {
    /// Exact name match (stored lower-case)
    Exact(String),
    /// Glob pattern match
    Glob(GlobPattern),
    /// Regex pattern match
    Regex(Regex),
}

impl FieldMatcherImpl {
    /// Compile a field matcher from configuration.
    pub fn compile(config: &FieldPattern) -> Result<Self, MatcherError> {
        match config.pattern_type {
            PatternType::Exact => {
                if config.pattern.trim().is_empty() {
                    return Err(MatcherError::EmptyFieldName);
                }
                Ok(Self::Exact(config.pattern.to_lowercase()))
            }
            PatternType::Glob => {
                let pattern = GlobPattern::new(&config.pattern)?;
                Ok(Self::Glob(pattern))
            }
            PatternType::Regex => {
                let regex = RegexBuilder::new(&config.pattern)
                    .case_insensitive(true)
                    .build()?;
                Ok(Self::Regex(regex))
            }
        }
    }

    /// Check a field name.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => name.eq_ignore_ascii_case(expected),
            Self::Glob(pattern) => pattern.matches_with(name, GLOB_OPTIONS),
            Self::Regex(regex) => regex.is_match(name),
        }
    }

    /// Pattern text, for messages.
    pub fn describe(&self) -> &str {
        match self {
            Self::Exact(name) => name,
            Self::Glob(pattern) => pattern.as_str(),
            Self::Regex(regex) => regex.as_str(),
        }
    }

    /// The single field this matcher names, if it is an exact matcher.
    pub fn exact_name(&self) -> Option<&str> {
        match self {
            Self::Exact(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str, pattern_type: PatternType) -> FieldMatcherImpl {
        FieldMatcherImpl::compile(&FieldPattern {
            pattern: pattern.to_string(),
            pattern_type,
        })
        .unwrap()
    }

    #[test]
    fn test_exact_match() {
        let matcher = compile("Title", PatternType::Exact);
        assert!(matcher.matches("title"));
        assert!(matcher.matches("TITLE"));
        assert!(!matcher.matches("booktitle"));
        assert_eq!(matcher.exact_name(), Some("title"));
    }

    #[test]
    fn test_glob_match() {
        let matcher = compile("*title", PatternType::Glob);
        assert!(matcher.matches("title"));
        assert!(matcher.matches("booktitle"));
        assert!(matcher.matches("BookTitle"));
        assert!(!matcher.matches("titles"));
        assert_eq!(matcher.exact_name(), None);
    }

    #[test]
    fn test_regex_match() {
        let matcher = compile("^(title|journal)$", PatternType::Regex);
        assert!(matcher.matches("title"));
        assert!(matcher.matches("Journal"));
        assert!(!matcher.matches("booktitle"));
    }

    #[test]
    fn test_invalid_patterns() {
        let bad_regex = FieldMatcherImpl::compile(&FieldPattern {
            pattern: "(unclosed".to_string(),
            pattern_type: PatternType::Regex,
        });
        assert!(matches!(bad_regex, Err(MatcherError::InvalidRegex(_))));

        let bad_glob = FieldMatcherImpl::compile(&FieldPattern {
            pattern: "[".to_string(),
            pattern_type: PatternType::Glob,
        });
        assert!(matches!(bad_glob, Err(MatcherError::InvalidGlob(_))));

        let empty = FieldMatcherImpl::compile(&FieldPattern {
            pattern: " ".to_string(),
            pattern_type: PatternType::Exact,
        });
        assert!(matches!(empty, Err(MatcherError::EmptyFieldName)));
    }
}
