//! BibTeX loading and writing.
//!
//! Parsing is delegated to the `biblatex` crate. Field values are taken
//! from the source text the parsed chunks point at, so rules see exactly
//! what the author typed, commands and accents included. Values that do not
//! map to one delimited span (`@string` abbreviations, `#` concatenation)
//! are rebuilt from the chunks instead: verbatim groups keep their braces,
//! math keeps its `$` delimiters and special characters are escaped again.

use crate::entry::{Entry, Fields};
use biblatex::{Bibliography, Chunk, Spanned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fields whose content is never escaped or braced.
const VERBATIM_FIELDS: &[&str] = &["url", "doi", "eprint", "file", "pdf"];

/// Parse BibTeX source into entries, in source order.
pub fn read_entries(src: &str) -> Result<Vec<Entry>, BibError> {
    let bibliography = Bibliography::parse(src).map_err(|e| BibError::Parse(e.to_string()))?;

    let entries: Vec<Entry> = bibliography
        .iter()
        .map(|entry| {
            let fields: Fields = entry
                .fields
                .iter()
                .map(|(name, chunks)| {
                    let value = raw_value(src, name, chunks)
                        .unwrap_or_else(|| chunks_to_latex(name, chunks));
                    (name.as_str(), value)
                })
                .collect();
            Entry {
                entry_type: entry.entry_type.to_string().to_lowercase(),
                key: entry.key.clone(),
                fields,
            }
        })
        .collect();

    debug!(entries = entries.len(), "Parsed bibliography");
    Ok(entries)
}

/// Read and parse a BibTeX file.
pub fn read_file(path: &Path) -> Result<Vec<Entry>, BibError> {
    let src = fs::read_to_string(path).map_err(|source| BibError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_entries(&src)
}

/// Serialize entries as BibTeX, one blank line between entries.
pub fn write_entries(entries: &[Entry]) -> String {
    let mut out = String::new();

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push('@');
        out.push_str(&entry.entry_type);
        out.push('{');
        out.push_str(&entry.key);
        out.push_str(",\n");
        for (name, value) in entry.fields.iter() {
            out.push_str("  ");
            out.push_str(name);
            out.push_str(" = {");
            out.push_str(value);
            out.push_str("},\n");
        }
        out.push_str("}\n");
    }

    out
}

/// Serialize entries and write them to `path`.
pub fn write_file(path: &Path, entries: &[Entry]) -> Result<(), BibError> {
    fs::write(path, write_entries(entries)).map_err(|source| BibError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The field value as written in `src`, located through the chunk spans.
///
/// Returns `None` unless the chunks sit inside one `{...}` or `"..."` group
/// (or a bare number) directly after `name =`.
fn raw_value(src: &str, name: &str, chunks: &[Spanned<Chunk>]) -> Option<String> {
    let start = chunks.iter().map(|c| c.span.start).min()?;
    let end = chunks.iter().map(|c| c.span.end).max()?;

    let before = src.get(..start)?;
    let eq = before.rfind('=')?;
    if !before[eq + 1..]
        .chars()
        .all(|c| c.is_whitespace() || c == '{' || c == '"')
    {
        return None;
    }
    let lhs = before[..eq].trim_end();
    let name_start = lhs.len().checked_sub(name.len())?;
    if !lhs.get(name_start..)?.eq_ignore_ascii_case(name)
        || lhs[..name_start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }

    let (value, value_end) = scan_value(src, eq + 1)?;
    (value_end >= end).then_some(value)
}

/// Read one delimited value starting at `pos` (after `=`). Returns the
/// value without its delimiters and the byte offset just past it.
fn scan_value(src: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut i = pos;
    while bytes.get(i)?.is_ascii_whitespace() {
        i += 1;
    }

    let (value, end) = match bytes[i] {
        b'{' => {
            let close = closing_delimiter(bytes, i + 1, b'}')?;
            (&src[i + 1..close], close + 1)
        }
        b'"' => {
            let close = closing_delimiter(bytes, i + 1, b'"')?;
            (&src[i + 1..close], close + 1)
        }
        _ => {
            let len = src[i..]
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(src.len() - i);
            if len == 0 {
                return None;
            }
            (&src[i..i + len], i + len)
        }
    };

    // Concatenated values are left to the chunks.
    let next = src[end..].trim_start();
    if next.starts_with('#') {
        return None;
    }

    Some((value.to_string(), end))
}

/// Offset of the unescaped `close` byte at brace depth zero.
fn closing_delimiter(bytes: &[u8], from: usize, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b if b == close && depth == 0 => return Some(i),
            b'{' => depth += 1,
            b'}' => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    None
}

fn chunks_to_latex(field: &str, chunks: &[Spanned<Chunk>]) -> String {
    let verbatim = VERBATIM_FIELDS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(field));

    chunks
        .iter()
        .map(|chunk| match &chunk.v {
            Chunk::Normal(s) if verbatim => s.clone(),
            Chunk::Normal(s) => escape_latex(s),
            Chunk::Verbatim(s) if verbatim => s.clone(),
            Chunk::Verbatim(s) => format!("{{{s}}}"),
            Chunk::Math(s) => format!("${s}$"),
        })
        .collect()
}

/// Escape the characters `biblatex` unescapes while parsing.
fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if matches!(c, '&' | '%' | '#' | '_' | '$') && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Errors while loading or writing a bibliography.
#[derive(Debug, thiserror::Error)]
pub enum BibError {
    #[error("BibTeX parse error: {0}")]
    Parse(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
