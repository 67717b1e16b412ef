//! Text cleanup primitives shared by the actions.
//!
//! All helpers understand BibTeX brace groups: text at brace depth greater
//! than zero is protected from case changes, and escaped braces (`\{`, `\}`)
//! do not open or close a group.

use regex::{NoExpand, Regex};

/// Brace depth before each byte of `text`.
pub fn brace_depths(text: &str) -> Vec<usize> {
    let mut depths = Vec::with_capacity(text.len());
    let mut depth = 0usize;
    let mut escaped = false;

    for byte in text.bytes() {
        depths.push(depth);
        match byte {
            b'\\' if !escaped => {
                escaped = true;
                continue;
            }
            b'{' if !escaped => depth += 1,
            b'}' if !escaped => depth = depth.saturating_sub(1),
            _ => {}
        }
        escaped = false;
    }

    depths
}

/// Whether the whole value is a single brace group, e.g. `{IEEE Press}`.
pub fn is_fully_braced(text: &str) -> bool {
    if !text.starts_with('{') || !text.ends_with('}') || text.len() < 2 {
        return false;
    }
    // The group opened by the first byte must close on the last byte.
    let depths = brace_depths(text);
    depths[1..text.len() - 1].iter().all(|&d| d > 0) && depths[text.len() - 1] == 1
}

/// Trim and collapse whitespace runs to a single space.
pub fn strip_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case everything outside brace groups. LaTeX command names keep
/// their case so `\LaTeX` survives.
pub fn lowercase_unprotected(text: &str) -> String {
    let depths = brace_depths(text);
    let mut out = String::with_capacity(text.len());
    let mut in_command = false;

    for (i, c) in text.char_indices() {
        if depths[i] > 0 {
            in_command = false;
            out.push(c);
            continue;
        }
        if c == '\\' {
            in_command = true;
            out.push(c);
            continue;
        }
        if in_command && c.is_ascii_alphabetic() {
            out.push(c);
            continue;
        }
        in_command = false;
        out.extend(c.to_lowercase());
    }

    out
}

/// The text a reader sees: `text` without the braces that open or close
/// groups. Escaped braces stay.
pub fn visible_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        let structural = matches!(c, '{' | '}') && !escaped;
        escaped = c == '\\' && !escaped;
        if !structural {
            out.push(c);
        }
    }
    out
}

/// Cut `text` to at most `max_chars` visible characters (group braces do
/// not count), backing off so no brace group is left open, then append
/// `ellipsis`. Returns `None` when the value is already short enough or was
/// already truncated, also after a later action braced it.
pub fn truncate(text: &str, max_chars: usize, ellipsis: &str) -> Option<String> {
    let visible = visible_text(text);
    let visible_count = visible.chars().count();
    if visible_count <= max_chars {
        return None;
    }
    if !ellipsis.is_empty()
        && visible.ends_with(ellipsis)
        && visible_count - ellipsis.chars().count() <= max_chars
    {
        return None;
    }

    let depths = brace_depths(text);
    let mut cut = 0;
    let mut shown = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if shown > max_chars {
            break;
        }
        if depths[i] == 0 {
            cut = i;
        }
        let structural = matches!(c, '{' | '}') && !escaped;
        escaped = c == '\\' && !escaped;
        if !structural {
            shown += 1;
        }
    }

    let mut out = text[..cut].trim_end().to_string();
    out.push_str(ellipsis);
    Some(out)
}

/// Regex substitution; `None` when nothing changed.
pub fn substitute(text: &str, regex: &Regex, replacement: &str) -> Option<String> {
    let replaced = regex.replace_all(text, replacement);
    (replaced != text).then(|| replaced.into_owned())
}

/// Literal replacement with a pre-built case-insensitive pattern.
pub fn replace_literal(text: &str, pattern: &Regex, to: &str) -> Option<String> {
    let replaced = pattern.replace_all(text, NoExpand(to));
    (replaced != text).then(|| replaced.into_owned())
}

/// Split on `separator` matches that sit outside brace groups.
pub fn split_top_level<'a>(text: &'a str, separator: &Regex) -> Vec<&'a str> {
    let depths = brace_depths(text);
    let mut parts = Vec::new();
    let mut start = 0;

    for m in separator.find_iter(text) {
        if depths[m.start()] == 0 {
            parts.push(&text[start..m.start()]);
            start = m.end();
        }
    }
    parts.push(&text[start..]);

    parts
}
