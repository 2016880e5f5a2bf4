//! URL list files.

use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::errors::RouterError;

/// Parses a URL list: one URL per line.
///
/// Lines are trimmed. Blank lines and lines starting with `#` are ignored.
/// A repeated URL keeps its first position and later copies are dropped.
#[must_use]
pub fn parse_url_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if seen.insert(line) {
            urls.push(line.to_string());
        } else {
            warn!(url = line, "Duplicate URL in list, ignoring");
        }
    }
    urls
}

/// Reads and parses a URL list file.
///
/// # Errors
///
/// Returns a usage error if the file does not exist, cannot be read, or
/// contains no URLs.
pub fn load_url_list(path: &Path) -> Result<Vec<String>, RouterError> {
    if !path.is_file() {
        return Err(RouterError::usage(format!(
            "URL file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        RouterError::usage(format!("Cannot read URL file {}: {e}", path.display()))
    })?;
    let urls = parse_url_list(&text);
    if urls.is_empty() {
        return Err(RouterError::usage(format!(
            "No valid URLs found in {}",
            path.display()
        )));
    }
    Ok(urls)
}
