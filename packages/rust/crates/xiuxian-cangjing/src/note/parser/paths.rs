use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::error::{VaultError, VaultResult};

/// Default extension appended to extension-less note paths.
pub const NOTE_EXTENSION: &str = "md";

pub(crate) fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Strip a trailing markdown extension, preserving case.
#[must_use]
pub fn trim_note_extension(raw: &str) -> &str {
    let lower = raw.to_lowercase();
    for ext in [".markdown", ".mdx", ".md"] {
        if lower.ends_with(ext) && raw.len() >= ext.len() {
            return &raw[..raw.len() - ext.len()];
        }
    }
    raw
}

/// Lookup key: NFKC, lowercase, forward slashes, no extension, no edge slashes.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let folded: String = raw.trim().nfkc().collect::<String>().to_lowercase();
    let slashed = normalize_slashes(&folded);
    trim_note_extension(&slashed).trim_matches('/').to_string()
}

/// Alphanumeric-only fold used by substring suggestions.
#[must_use]
pub fn fold_for_match(raw: &str) -> String {
    raw.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|ch| ch.is_alphanumeric())
        .collect()
}

/// Whether a file extension is indexed.
#[must_use]
pub fn is_supported_note(path: &Path) -> bool {
    path.extension()
        .and_then(|v| v.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_lowercase();
            matches!(lower.as_str(), "md" | "markdown" | "mdx")
        })
}

/// File name without extension.
#[must_use]
pub fn stem_of(rel_path: &str) -> String {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    trim_note_extension(name).to_string()
}

/// Parent folder of a relative path (`""` for the root).
#[must_use]
pub fn folder_of(rel_path: &str) -> &str {
    rel_path.rsplit_once('/').map_or("", |(folder, _)| folder)
}

/// Path of `target` as written from a note in `from_folder`, e.g.
/// `relative_link("notes/daily", "archive/x.md") == "../../archive/x.md"`.
#[must_use]
pub fn relative_link(from_folder: &str, target: &str) -> String {
    let from: Vec<&str> = from_folder.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let shared = from
        .iter()
        .zip(to.iter())
        .take_while(|(left, right)| left == right)
        .count()
        .min(to.len().saturating_sub(1));
    let mut parts: Vec<&str> = vec![".."; from.len() - shared];
    parts.extend_from_slice(&to[shared..]);
    parts.join("/")
}

/// Collapse `.`/`..` segments in a vault-relative path.
///
/// # Errors
/// Returns [`VaultError::PathEscapesRoot`] when `..` climbs above the root and
/// [`VaultError::InvalidInput`] for empty paths.
pub fn clean_relative(raw: &str) -> VaultResult<String> {
    let slashed = normalize_slashes(raw.trim());
    let mut parts: Vec<&str> = Vec::new();
    for segment in slashed.split('/') {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(VaultError::PathEscapesRoot(raw.to_string()));
                }
            }
            _ => parts.push(segment),
        }
    }
    if parts.is_empty() {
        return Err(VaultError::invalid("path must not be empty"));
    }
    Ok(parts.join("/"))
}

/// Append `.md` when the path has no markdown extension.
#[must_use]
pub fn ensure_note_extension(rel_path: &str) -> String {
    if is_supported_note(Path::new(rel_path)) {
        rel_path.to_string()
    } else {
        format!("{rel_path}.{NOTE_EXTENSION}")
    }
}
