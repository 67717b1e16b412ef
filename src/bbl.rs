//! Citation keys from a LaTeX `.bbl` file.

use crate::bibtex::BibError;
use indexmap::IndexSet;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// `\bibitem{key}` or `\bibitem[label]{key}`.
static BIBITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\bibitem\s*(?:\[.*?\])?\s*\{([^}\s]+)\}")
        .expect("bibitem pattern is valid")
});

/// Keys cited in a `.bbl` file, in order of first appearance.
pub fn cited_keys(bbl: &str) -> IndexSet<String> {
    BIBITEM_REGEX
        .captures_iter(bbl)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Read a `.bbl` file and extract its keys.
pub fn read_bbl(path: &Path) -> Result<IndexSet<String>, BibError> {
    let text = fs::read_to_string(path).map_err(|source| BibError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cited_keys(&text))
}
