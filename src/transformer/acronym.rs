//! Acronym and whole-value brace protection.

use super::text::{brace_depths, is_fully_braced};
use regex::Regex;
use std::sync::LazyLock;

/// Word tokens for the all-caps heuristic.
static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is valid"));

/// Wraps acronyms in braces so BibTeX styles cannot lower-case them.
#[derive(Debug)]
pub struct AcronymProtector {
    /// Canonical spelling and its case-insensitive pattern
    acronyms: Vec<(String, Regex)>,
    /// Also protect words written in capitals
    detect_all_caps: bool,
}

impl AcronymProtector {
    /// Build the patterns for a list of acronyms.
    pub fn new(acronyms: &[String], detect_all_caps: bool) -> Result<Self, regex::Error> {
        let acronyms = acronyms
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(|a| {
                let a = a.trim();
                Regex::new(&acronym_pattern(a)).map(|re| (a.to_string(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            acronyms,
            detect_all_caps,
        })
    }

    /// Protect every acronym occurrence outside existing brace groups.
    /// Returns `None` when nothing changed.
    pub fn protect(&self, text: &str) -> Option<String> {
        let mut current = text.to_string();

        for (canonical, regex) in &self.acronyms {
            current = protect_matches(&current, regex, |_| Some(canonical.as_str()));
        }

        if self.detect_all_caps {
            current = protect_matches(&current, &WORD_REGEX, all_caps_core);
        }

        (current != text).then_some(current)
    }
}

/// Pattern matching an acronym at a word start, allowing a plural `s`.
/// Group 1 is the acronym itself.
fn acronym_pattern(acronym: &str) -> String {
    let starts_word = acronym.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = acronym.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "(?i){}({}){}",
        if starts_word { r"\b" } else { "" },
        regex::escape(acronym),
        if ends_word { r"(?:s\b|\b)" } else { "" },
    )
}

/// The part of an all-caps word that should be protected (plural `s`
/// excluded), or `None` for ordinary words.
fn all_caps_core(word: &str) -> Option<&str> {
    let core = match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem,
        _ => word,
    };
    let uppercase = core.chars().filter(|c| c.is_uppercase()).count();
    let has_lowercase = core.chars().any(char::is_lowercase);
    (uppercase >= 2 && !has_lowercase).then_some(core)
}

/// Wrap regex matches at brace depth zero. `replacement` receives the
/// matched text (group 1 when present) and returns the spelling to wrap,
/// or `None` to leave the match alone.
fn protect_matches<'t, F>(text: &'t str, regex: &Regex, mut replacement: F) -> String
where
    F: FnMut(&'t str) -> Option<&'t str>,
{
    let depths = brace_depths(text);
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;

    for caps in regex.captures_iter(text) {
        let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
            continue;
        };
        if depths[m.start()] > 0 || text[..m.start()].ends_with('\\') {
            continue;
        }
        let Some(spelling) = replacement(m.as_str()) else {
            continue;
        };
        out.push_str(&text[last..m.start()]);
        out.push('{');
        out.push_str(spelling);
        out.push('}');
        last = m.start() + spelling_len(m.as_str(), spelling);
    }
    out.push_str(&text[last..]);

    out
}

/// Bytes of the match consumed by the wrapped spelling. For all-caps words
/// the spelling is a prefix of the match; for acronyms it replaces it.
fn spelling_len(matched: &str, spelling: &str) -> usize {
    if matched.starts_with(spelling) {
        spelling.len()
    } else {
        matched.len()
    }
}

/// Wrap the whole value in braces unless it already is one group.
pub fn protect_whole(text: &str) -> Option<String> {
    if text.is_empty() || is_fully_braced(text) {
        None
    } else {
        Some(format!("{{{text}}}"))
    }
}
