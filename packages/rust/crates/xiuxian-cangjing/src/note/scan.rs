//! Vault walk with an explicit exclusion and depth policy.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use super::parser::is_supported_note;

/// Which paths the scan visits.
#[derive(Debug, Clone, Default)]
pub struct ScanPolicy {
    excluded_prefixes: Vec<String>,
    max_depth: Option<usize>,
}

/// A note file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Vault-relative path, forward slashes.
    pub rel_path: String,
    /// Absolute path.
    pub abs_path: PathBuf,
    /// Modification time in ms since epoch (0 when unavailable).
    pub modified_ms: i64,
}

fn normalize_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim().replace('\\', "/");
    let trimmed = trimmed.trim_matches('/').to_lowercase();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl ScanPolicy {
    /// Policy from configured prefixes and optional depth limit.
    #[must_use]
    pub fn new(excluded_prefixes: &[String], max_depth: Option<usize>) -> Self {
        let mut prefixes: Vec<String> = excluded_prefixes
            .iter()
            .filter_map(|raw| normalize_prefix(raw))
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self {
            excluded_prefixes: prefixes,
            max_depth,
        }
    }

    /// Whether `rel_path` may be visited. Hidden directories are always
    /// skipped; a hidden file name is allowed.
    #[must_use]
    pub fn allows(&self, rel_path: &str, is_dir: bool) -> bool {
        let lower = rel_path.trim_matches('/').to_lowercase();
        if lower.is_empty() {
            return true;
        }
        let mut components = lower.split('/').filter(|c| !c.is_empty()).peekable();
        while let Some(component) = components.next() {
            let is_last = components.peek().is_none();
            if !is_dir && is_last {
                break;
            }
            if component.starts_with('.') {
                return false;
            }
        }
        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| lower == *prefix || lower.starts_with(&format!("{prefix}/")))
    }

    /// Whether a note path should be indexed.
    #[must_use]
    pub fn admits_note(&self, rel_path: &str) -> bool {
        is_supported_note(Path::new(rel_path)) && self.allows(rel_path, false)
    }
}

/// Modification time of `path` in ms since epoch.
#[must_use]
pub fn modified_ms(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}

fn relative_string(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

/// Walk `root` and list admissible note files, sorted by path.
#[must_use]
pub fn scan_notes(root: &Path, policy: &ScanPolicy) -> Vec<ScannedFile> {
    let mut walker = WalkDir::new(root).follow_links(false);
    if let Some(depth) = policy.max_depth {
        walker = walker.max_depth(depth.saturating_add(1));
    }
    let mut out: Vec<ScannedFile> = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|entry| {
            relative_string(entry.path(), root)
                .is_none_or(|rel| policy.allows(&rel, entry.file_type().is_dir()))
        })
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_supported_note(path) {
            continue;
        }
        let Some(rel_path) = relative_string(path, root) else {
            continue;
        };
        out.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
            modified_ms: modified_ms(path),
        });
    }
    out.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    out
}

/// Apply the policy to a caller-supplied path list.
#[must_use]
pub fn filter_paths<'a, I>(paths: I, policy: &ScanPolicy) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = paths
        .into_iter()
        .map(|raw| raw.replace('\\', "/").trim_matches('/').to_string())
        .filter(|rel| !rel.is_empty() && policy.admits_note(rel))
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_skips_prefixes_and_hidden_dirs() {
        let policy = ScanPolicy::new(&["node_modules".into(), "Archive/Old/".into()], None);
        assert!(policy.allows("notes/a.md", false));
        assert!(policy.allows("notes/.hidden.md", false));
        assert!(!policy.allows(".obsidian/a.md", false));
        assert!(!policy.allows("node_modules/pkg/readme.md", false));
        assert!(!policy.allows("archive/old/x.md", false));
        assert!(policy.allows("archive/older/x.md", false));
    }

    #[test]
    fn filter_paths_keeps_only_notes() {
        let policy = ScanPolicy::new(&[".git".into()], None);
        let kept = filter_paths(["b.md", "a.txt", ".git/x.md", "/c.markdown", "b.md"], &policy);
        assert_eq!(kept, vec!["b.md".to_string(), "c.markdown".to_string()]);
    }
}
