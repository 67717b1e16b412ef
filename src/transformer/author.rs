//! Author list handling.

use super::text::split_top_level;
use regex::Regex;
use std::sync::LazyLock;

/// Separator between names in a BibTeX name list.
static AND_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+and\s+").expect("separator pattern is valid"));

/// Marker appended to the last kept author when a list is truncated.
pub const ET_AL_MARK: &str = r"~{\it{et al.}}";

/// Split a name list on top-level `and`.
pub fn split_authors(authors: &str) -> Vec<&str> {
    split_top_level(authors.trim(), &AND_REGEX)
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect()
}

/// Truncate a name list longer than `threshold`, keeping `threshold`
/// names (only the first one in IEEE mode) and marking the last kept name
/// with *et al.* Returns `None` when the list is short enough.
pub fn apply_et_al(authors: &str, threshold: usize, ieee_mode: bool) -> Option<String> {
    if threshold == 0 {
        return None;
    }
    let names = split_authors(authors);
    if names.len() <= threshold {
        return None;
    }

    let keep = if ieee_mode { 1 } else { threshold };
    let mut kept: Vec<String> = names[..keep].iter().map(|s| s.to_string()).collect();
    if let Some(last) = kept.last_mut() {
        *last = mark_et_al(last);
    }

    Some(kept.join(" and "))
}

/// Put the marker after the family name: `Doe, John` becomes
/// `Doe~{\it{et al.}}, John`; `John Doe` becomes `John Doe~{\it{et al.}}`.
fn mark_et_al(name: &str) -> String {
    match name.split_once(',') {
        Some((family, given)) => format!("{}{ET_AL_MARK},{given}", family.trim_end()),
        None => format!("{name}{ET_AL_MARK}"),
    }
}

/// Whether "et al." was typed into the list by hand.
pub fn has_embedded_et_al(authors: &str) -> bool {
    authors.replace(ET_AL_MARK, "").contains("et al")
}
