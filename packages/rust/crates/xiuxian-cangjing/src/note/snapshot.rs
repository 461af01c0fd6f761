//! Persisted index snapshot used for previews when files are unreadable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::NoteDocument;
use crate::error::{VaultError, VaultResult};
use crate::persist::atomic_write_text;

/// Schema tag written into every snapshot.
pub const INDEX_SNAPSHOT_SCHEMA_VERSION: &str = "xiuxian_cangjing.index_snapshot.v1";

/// One note as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Vault-relative path.
    pub path: String,
    /// Body prefix.
    pub preview: String,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Modification time.
    #[serde(default)]
    pub modified_ms: i64,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw link targets.
    #[serde(default)]
    pub links: Vec<String>,
}

impl From<&NoteDocument> for SnapshotDocument {
    fn from(doc: &NoteDocument) -> Self {
        let mut links = doc.xrefs.clone();
        links.extend(doc.field_refs.iter().map(|r| r.target.clone()));
        links.sort();
        links.dedup();
        Self {
            path: doc.path.clone(),
            preview: doc.preview.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            modified_ms: doc.modified_ms,
            tags: doc.tags.clone(),
            links,
        }
    }
}

/// Persisted snapshot envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Always [`INDEX_SNAPSHOT_SCHEMA_VERSION`].
    pub schema_version: String,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    /// Store revision at write time.
    #[serde(default)]
    pub revision: u64,
    /// Notes.
    pub documents: Vec<SnapshotDocument>,
}

impl IndexSnapshot {
    /// Capture the given documents.
    pub fn capture<'a, I>(documents: I, revision: u64) -> Self
    where
        I: IntoIterator<Item = &'a NoteDocument>,
    {
        Self {
            schema_version: INDEX_SNAPSHOT_SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            revision,
            documents: documents.into_iter().map(SnapshotDocument::from).collect(),
        }
    }
}

/// Write atomically.
///
/// # Errors
/// Returns IO or serialization failures.
pub fn write_snapshot(path: &Path, snapshot: &IndexSnapshot) -> VaultResult<()> {
    let payload = serde_json::to_string(snapshot)?;
    atomic_write_text(path, &payload)
}

/// Read a snapshot; `Ok(None)` when absent or written by another schema.
///
/// # Errors
/// Returns IO failures other than not-found, and malformed JSON.
pub fn read_snapshot(path: &Path) -> VaultResult<Option<IndexSnapshot>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(VaultError::io(path, err)),
    };
    let snapshot: IndexSnapshot = serde_json::from_str(&text)?;
    if snapshot.schema_version != INDEX_SNAPSHOT_SCHEMA_VERSION {
        log::warn!(
            "ignoring index snapshot with schema {} at {}",
            snapshot.schema_version,
            path.display()
        );
        return Ok(None);
    }
    Ok(Some(snapshot))
}
