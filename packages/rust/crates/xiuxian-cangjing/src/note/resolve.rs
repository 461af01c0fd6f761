//! Reference resolution: exact lookups first, fuzzy suggestions second.

use std::collections::HashMap;

use super::models::{MatchKind, NoteDocument, Resolution};
use super::parser::{fold_for_match, normalize_key, normalize_wikilink_target};

/// Maximum number of suggestions returned for an unresolved reference.
pub const MAX_SUGGESTIONS: usize = 10;

/// Exact lookup tables keyed by [`normalize_key`].
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    by_path: HashMap<String, Vec<String>>,
    by_stem: HashMap<String, Vec<String>>,
    by_title: HashMap<String, Vec<String>>,
    by_alias: HashMap<String, Vec<String>>,
    by_id: HashMap<String, Vec<String>>,
}

fn push(table: &mut HashMap<String, Vec<String>>, key: &str, path: &str) {
    let key = normalize_key(key);
    if key.is_empty() {
        return;
    }
    table.entry(key).or_default().push(path.to_string());
}

fn pick(table: &HashMap<String, Vec<String>>, key: &str) -> Option<String> {
    table
        .get(key)?
        .iter()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// Strip wikilink brackets, labels and anchors from user input.
#[must_use]
pub fn clean_reference(input: &str) -> String {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .unwrap_or(trimmed);
    let inner = inner.strip_prefix("./").unwrap_or(inner);
    normalize_wikilink_target(inner).unwrap_or_default()
}

impl LookupTables {
    /// Build tables for a document set.
    pub fn build<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a NoteDocument>,
    {
        let mut tables = Self::default();
        for doc in documents {
            push(&mut tables.by_path, &doc.path, &doc.path);
            push(&mut tables.by_stem, &doc.stem, &doc.path);
            push(&mut tables.by_title, &doc.title, &doc.path);
            for alias in &doc.aliases {
                push(&mut tables.by_alias, alias, &doc.path);
            }
            if let Some(id) = &doc.short_id {
                push(&mut tables.by_id, id, &doc.path);
            }
        }
        tables
    }

    /// Notes whose file name is `stem`.
    #[must_use]
    pub fn paths_with_stem(&self, stem: &str) -> &[String] {
        self.by_stem
            .get(&normalize_key(stem))
            .map_or(&[], Vec::as_slice)
    }

    /// Exact match in priority order: path, stem, title, alias, id.
    /// Ties go to the shortest, then lexicographically first, path.
    #[must_use]
    pub fn resolve_exact(&self, input: &str) -> Option<(String, MatchKind)> {
        let key = normalize_key(&clean_reference(input));
        if key.is_empty() {
            return None;
        }
        [
            (&self.by_path, MatchKind::Path),
            (&self.by_stem, MatchKind::Stem),
            (&self.by_title, MatchKind::Title),
            (&self.by_alias, MatchKind::Alias),
            (&self.by_id, MatchKind::ShortId),
        ]
        .into_iter()
        .find_map(|(table, kind)| pick(table, &key).map(|path| (path, kind)))
    }
}

/// Substring suggestions over normalized titles and file names.
pub fn suggest<'a, I>(documents: I, input: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a NoteDocument>,
{
    let needle = fold_for_match(&clean_reference(input));
    if needle.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(u8, usize, &str)> = Vec::new();
    for doc in documents {
        let title = fold_for_match(&doc.title);
        let stem = fold_for_match(&doc.stem);
        let rank = if title.starts_with(&needle) || stem.starts_with(&needle) {
            0
        } else if title.contains(&needle) || stem.contains(&needle) {
            1
        } else if needle.contains(&stem) && !stem.is_empty() {
            2
        } else {
            continue;
        };
        scored.push((rank, doc.path.len(), doc.path.as_str()));
    }
    scored.sort();
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, path)| path.to_string())
        .collect()
}

/// Full resolution: exact lookup, else suggestions.
pub fn resolve<'a, I>(tables: &LookupTables, documents: I, input: &str) -> Resolution
where
    I: IntoIterator<Item = &'a NoteDocument>,
{
    if let Some((path, kind)) = tables.resolve_exact(input) {
        return Resolution {
            input: input.to_string(),
            path: Some(path),
            matched_by: Some(kind),
            suggestions: Vec::new(),
        };
    }
    Resolution {
        input: input.to_string(),
        path: None,
        matched_by: None,
        suggestions: suggest(documents, input, MAX_SUGGESTIONS),
    }
}
