//! Consistency checks run after the rules.

use crate::config::{Requirement, ALL_TYPES};
use crate::entry::Entry;
use crate::transformer::has_embedded_et_al;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// A quoted year like `'95`.
static QUOTED_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'\d{2}\b").expect("quoted year pattern is valid"));

/// A full year like `1995`.
static FULL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("full year pattern is valid"));

/// Requirements that apply to `entry`: the `all` list plus the list for its
/// type.
pub fn requirements_for<'a>(
    required: &'a IndexMap<String, Vec<Requirement>>,
    entry: &Entry,
) -> impl Iterator<Item = &'a Requirement> {
    let entry_type = entry.entry_type.clone();
    required
        .iter()
        .filter(move |(t, _)| t.eq_ignore_ascii_case(ALL_TYPES) || t.eq_ignore_ascii_case(&entry_type))
        .flat_map(|(_, reqs)| reqs.iter())
}

/// Requirements the entry does not satisfy, rendered for messages.
pub fn missing_required(
    required: &IndexMap<String, Vec<Requirement>>,
    entry: &Entry,
) -> Vec<String> {
    requirements_for(required, entry)
        .filter(|req| !req.alternatives().iter().any(|f| entry.has(f)))
        .map(|req| match req {
            Requirement::Field(name) => name.clone(),
            Requirement::AnyOf(names) => names.join(" | "),
        })
        .collect()
}

/// Whether "et al." was written into the author field by hand.
pub fn et_al_in_author(entry: &Entry) -> bool {
    entry.get("author").is_some_and(has_embedded_et_al)
}

/// Whether the booktitle mentions a year.
pub fn year_in_booktitle(entry: &Entry) -> bool {
    entry
        .get("booktitle")
        .is_some_and(|title| QUOTED_YEAR.is_match(title) || FULL_YEAR.is_match(title))
}

/// A citation key seen more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// Position of the first entry with this key
    pub first: usize,
    /// Position of the repeated entry
    pub index: usize,
}

/// Find entries whose key repeats an earlier key, comparing without case.
pub fn find_duplicate_keys(entries: &[Entry]) -> Vec<Duplicate> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match seen.get(&entry.key.to_lowercase()) {
            Some(&first) => duplicates.push(Duplicate { first, index }),
            None => {
                seen.insert(entry.key.to_lowercase(), index);
            }
        }
    }

    duplicates
}
