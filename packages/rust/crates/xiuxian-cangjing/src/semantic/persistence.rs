//! Embedding snapshot: one JSON object mapping path to vector.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;

use crate::error::{VaultError, VaultResult};
use crate::persist::{atomic_write_text, backup_existing, backup_path};

/// In-memory vector table.
pub type VectorTable = BTreeMap<String, Vec<f32>>;

/// Back up the previous snapshot (best-effort) and atomically rewrite it.
///
/// # Errors
/// Returns serialization or IO failures of the rewrite itself.
pub fn save_vectors(path: &Path, vectors: &VectorTable, backup: bool) -> VaultResult<()> {
    if backup && let Err(err) = backup_existing(path) {
        warn!("embedding backup skipped: {err}");
    }
    let payload = serde_json::to_string(vectors)?;
    atomic_write_text(path, &payload)
}

fn read_table(path: &Path) -> VaultResult<Option<VectorTable>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(VaultError::io(path, err)),
    }
}

/// Load the snapshot, falling back to its `.bak` when the primary is corrupt.
#[must_use]
pub fn load_vectors(path: &Path) -> VectorTable {
    match read_table(path) {
        Ok(Some(table)) => return table,
        Ok(None) => {}
        Err(err) => warn!("embedding snapshot unreadable ({err}); trying backup"),
    }
    match read_table(&backup_path(path)) {
        Ok(Some(table)) => table,
        Ok(None) => VectorTable::new(),
        Err(err) => {
            warn!("embedding backup unreadable ({err}); starting empty");
            VectorTable::new()
        }
    }
}
