//! Crash-safe file replacement.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};

/// Write `content` to a sibling temp file, fsync it, then rename over `path`.
///
/// # Errors
/// Returns [`VaultError::Io`] when any step fails; the temp file is removed on failure.
pub fn atomic_write_text(path: &Path, content: &str) -> VaultResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| VaultError::io(parent, err))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("snapshot");
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = write_and_rename(&tmp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_rename(tmp_path: &Path, path: &Path, content: &str) -> VaultResult<()> {
    let mut file = File::create(tmp_path).map_err(|err| VaultError::io(tmp_path, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| VaultError::io(tmp_path, err))?;
    file.sync_all().map_err(|err| VaultError::io(tmp_path, err))?;
    drop(file);
    fs::rename(tmp_path, path).map_err(|err| VaultError::io(path, err))
}

/// `<path>.bak`
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".bak");
    PathBuf::from(raw)
}

/// Copy an existing file to its `.bak` sibling. Missing sources are ignored.
///
/// # Errors
/// Returns [`VaultError::Io`] when the copy fails.
pub fn backup_existing(path: &Path) -> VaultResult<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|err| VaultError::io(&backup, err))?;
    Ok(true)
}
