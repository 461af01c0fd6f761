use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wikilink stored in a front matter field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Lowercased field name.
    pub field: String,
    /// Raw link target.
    pub target: String,
}

/// Parsed note, keyed by its vault-relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDocument {
    /// Vault-relative path with extension and forward slashes.
    pub path: String,
    /// Lowercased path.
    #[serde(skip)]
    pub path_lower: String,
    /// File name without extension.
    pub stem: String,
    /// Front matter title, else first `#` heading, else stem.
    pub title: String,
    /// Lowercased title.
    #[serde(skip)]
    pub title_lower: String,
    /// Front matter description, else a short lead.
    pub description: String,
    /// Body after front matter.
    #[serde(skip_serializing, default)]
    pub body: String,
    /// Lowercased body.
    #[serde(skip)]
    pub body_lower: String,
    /// Bounded body prefix.
    pub preview: String,
    /// Front matter tags plus inline `#hashtags`.
    pub tags: Vec<String>,
    /// Alternative names.
    pub aliases: Vec<String>,
    /// Front matter `type`.
    pub doc_type: Option<String>,
    /// Front matter `id`.
    pub short_id: Option<String>,
    /// File modification time (ms since epoch).
    pub modified_ms: i64,
    /// All front matter fields.
    pub frontmatter: Map<String, Value>,
    /// Body link targets (raw).
    #[serde(skip)]
    pub xrefs: Vec<String>,
    /// Front matter link targets (raw).
    #[serde(skip)]
    pub field_refs: Vec<FieldRef>,
    /// Unique lowercased body words used for fuzzy matching.
    #[serde(skip)]
    pub vocabulary: Vec<String>,
    /// xxh3 hash of the raw file content.
    #[serde(skip)]
    pub content_hash: u64,
}

impl NoteDocument {
    /// Every searchable string joined and lowercased.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(self.body_lower.len() + 256);
        text.push_str(&self.title_lower);
        text.push('\n');
        text.push_str(&self.description.to_lowercase());
        text.push('\n');
        text.push_str(&self.path_lower);
        text.push('\n');
        text.push_str(&self.tags.join(" ").to_lowercase());
        text.push('\n');
        text.push_str(&self.aliases.join(" ").to_lowercase());
        text.push('\n');
        if let Some(doc_type) = &self.doc_type {
            text.push_str(&doc_type.to_lowercase());
            text.push('\n');
        }
        text.push_str(&self.body_lower);
        text
    }
}

/// How a reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Relative path with or without extension.
    Path,
    /// File name without extension.
    Stem,
    /// Note title.
    Title,
    /// Front matter alias.
    Alias,
    /// Front matter `id`.
    ShortId,
}

/// Outcome of reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Input as given.
    pub input: String,
    /// Canonical path when resolved.
    pub path: Option<String>,
    /// Lookup table that matched.
    pub matched_by: Option<MatchKind>,
    /// Near matches when unresolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Summary of a full vault load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Notes indexed.
    pub documents: usize,
    /// Unreadable files recovered from their preview.
    pub recovered: usize,
    /// Unreadable files with no fallback.
    pub failed: usize,
    /// Store revision after the load.
    pub revision: u64,
    /// Wall time of the load.
    pub elapsed_ms: u64,
}

/// What a single-file reindex did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// New record.
    Inserted,
    /// Existing record replaced.
    Updated,
    /// Content hash unchanged.
    Unchanged,
    /// File vanished and the record was dropped.
    Removed,
    /// Not a note, excluded, or unreadable without fallback.
    Skipped,
}
