//! In-memory note index with derived lookups and backlinks.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use super::models::{IndexOutcome, LoadReport, NoteDocument, Resolution};
use super::parser::{clean_relative, normalize_slashes, parse_note};
use super::resolve::{LookupTables, resolve, suggest, MAX_SUGGESTIONS};
use super::scan::{ScanPolicy, modified_ms, scan_notes};
use super::snapshot::{IndexSnapshot, read_snapshot, write_snapshot};
use crate::config::EngineConfig;
use crate::error::{VaultError, VaultResult};
use crate::graph::BacklinkIndex;

/// Result of a `reindex_since` sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReindexSinceReport {
    /// Paths re-read because their mtime is newer than the cutoff.
    pub reindexed: Vec<String>,
    /// Records dropped because their file disappeared.
    pub removed: Vec<String>,
    /// Revision after the sweep.
    pub revision: u64,
}

/// Owner of every indexed note.
///
/// All mutations end in a commit that rebuilds lookups and backlinks, bumps
/// the revision and persists the snapshot, so readers never observe a
/// half-applied change.
#[derive(Debug)]
pub struct NoteStore {
    root: PathBuf,
    policy: ScanPolicy,
    preview_len: usize,
    snapshot_path: PathBuf,
    docs: BTreeMap<String, NoteDocument>,
    path_index: HashMap<String, String>,
    lookup: LookupTables,
    backlinks: BacklinkIndex,
    revision: u64,
}

/// Notes must be UTF-8; anything else counts as unreadable.
fn read_note_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

impl NoteStore {
    /// Open a store over `config.root` without loading notes.
    ///
    /// # Errors
    /// Returns [`VaultError::RootMissing`] when the root is not a directory.
    pub fn open(config: &EngineConfig) -> VaultResult<Self> {
        if !config.root.is_dir() {
            return Err(VaultError::RootMissing(config.root.clone()));
        }
        let root = config
            .root
            .canonicalize()
            .map_err(|err| VaultError::io(&config.root, err))?;
        let snapshot_path = config
            .index_snapshot_path
            .clone()
            .unwrap_or_else(|| root.join(crate::config::STATE_DIR).join("index.json"));
        Ok(Self {
            root,
            policy: ScanPolicy::new(&config.excluded_prefixes, config.max_scan_depth),
            preview_len: config.preview_len,
            snapshot_path,
            docs: BTreeMap::new(),
            path_index: HashMap::new(),
            lookup: LookupTables::default(),
            backlinks: BacklinkIndex::default(),
            revision: 0,
        })
    }

    /// Canonical vault root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Monotonic revision, bumped by every commit.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when no notes are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Notes in path order.
    pub fn documents(&self) -> impl Iterator<Item = &NoteDocument> {
        self.docs.values()
    }

    /// Note by canonical path (case-insensitive).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&NoteDocument> {
        self.docs.get(path).or_else(|| {
            self.path_index
                .get(&path.to_lowercase())
                .and_then(|canonical| self.docs.get(canonical))
        })
    }

    /// Exact lookup tables.
    #[must_use]
    pub fn lookup(&self) -> &LookupTables {
        &self.lookup
    }

    /// Reverse edge index.
    #[must_use]
    pub fn backlinks(&self) -> &BacklinkIndex {
        &self.backlinks
    }

    /// Scan policy.
    #[must_use]
    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Resolve a reference; unresolved input carries suggestions.
    #[must_use]
    pub fn resolve(&self, input: &str) -> Resolution {
        resolve(&self.lookup, self.docs.values(), input)
    }

    /// Resolve or fail with [`VaultError::NotFound`].
    ///
    /// # Errors
    /// Returns `NotFound` with suggestions when nothing matches.
    pub fn require(&self, input: &str) -> VaultResult<&NoteDocument> {
        if let Some((path, _)) = self.lookup.resolve_exact(input)
            && let Some(doc) = self.docs.get(&path)
        {
            return Ok(doc);
        }
        Err(VaultError::NotFound {
            input: input.to_string(),
            suggestions: suggest(self.docs.values(), input, MAX_SUGGESTIONS),
        })
    }

    /// Normalize caller input into a vault-relative path.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` for paths outside the vault.
    pub fn relative_path(&self, input: &str) -> VaultResult<String> {
        let raw = Path::new(input.trim());
        if raw.is_absolute() {
            let rel = raw
                .strip_prefix(&self.root)
                .map_err(|_| VaultError::PathEscapesRoot(input.to_string()))?;
            return clean_relative(&normalize_slashes(&rel.to_string_lossy()));
        }
        clean_relative(input)
    }

    /// Absolute path for a vault-relative path, verified to stay inside the root.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` when the path, or an existing ancestor after
    /// symlink resolution, lies outside the root.
    pub fn absolute_path(&self, rel_path: &str) -> VaultResult<PathBuf> {
        let rel = self.relative_path(rel_path)?;
        let joined = self.root.join(&rel);
        let mut existing = joined.as_path();
        while !existing.exists() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        if let Ok(canonical) = existing.canonicalize()
            && !canonical.starts_with(&self.root)
        {
            return Err(VaultError::PathEscapesRoot(rel_path.to_string()));
        }
        Ok(joined)
    }

    fn snapshot_previews(&self) -> HashMap<String, String> {
        match read_snapshot(&self.snapshot_path) {
            Ok(Some(snapshot)) => snapshot
                .documents
                .into_iter()
                .map(|doc| (doc.path, doc.preview))
                .collect(),
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!("index snapshot unreadable, previews unavailable: {err}");
                HashMap::new()
            }
        }
    }

    fn fallback_document(&self, rel_path: &str, preview: &str, mtime: i64) -> NoteDocument {
        let mut doc = parse_note(rel_path, preview, mtime, self.preview_len);
        if let Some(existing) = self.docs.get(rel_path) {
            doc.title.clone_from(&existing.title);
            doc.title_lower.clone_from(&existing.title_lower);
            doc.frontmatter.clone_from(&existing.frontmatter);
            doc.field_refs.clone_from(&existing.field_refs);
            doc.aliases.clone_from(&existing.aliases);
            doc.short_id.clone_from(&existing.short_id);
        }
        doc
    }

    /// Rescan the whole vault, replacing every record.
    ///
    /// # Errors
    /// Returns `RootMissing` when the root vanished.
    pub fn load_all(&mut self) -> VaultResult<LoadReport> {
        if !self.root.is_dir() {
            return Err(VaultError::RootMissing(self.root.clone()));
        }
        let started = Instant::now();
        let files = scan_notes(&self.root, &self.policy);
        let mut previews: Option<HashMap<String, String>> = None;
        let mut next: BTreeMap<String, NoteDocument> = BTreeMap::new();
        let mut report = LoadReport::default();

        for file in files {
            match read_note_file(&file.abs_path) {
                Ok(content) => {
                    let doc = parse_note(&file.rel_path, &content, file.modified_ms, self.preview_len);
                    next.insert(file.rel_path, doc);
                }
                Err(err) => {
                    let fallback = self.docs.get(&file.rel_path).map(|d| d.preview.clone()).or_else(|| {
                        previews
                            .get_or_insert_with(|| self.snapshot_previews())
                            .get(&file.rel_path)
                            .cloned()
                    });
                    if let Some(preview) = fallback {
                        warn!("{} unreadable ({err}); indexing preview", file.rel_path);
                        let doc = self.fallback_document(&file.rel_path, &preview, file.modified_ms);
                        next.insert(file.rel_path, doc);
                        report.recovered += 1;
                    } else {
                        warn!("{} unreadable ({err}); skipped", file.rel_path);
                        report.failed += 1;
                    }
                }
            }
        }

        self.docs = next;
        self.commit();
        report.documents = self.docs.len();
        report.revision = self.revision;
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "indexed {} notes ({} recovered, {} failed) in {}ms",
            report.documents, report.recovered, report.failed, report.elapsed_ms
        );
        Ok(report)
    }

    fn canonical_key(&self, rel: &str) -> String {
        self.path_index
            .get(&rel.to_lowercase())
            .cloned()
            .unwrap_or_else(|| rel.to_string())
    }

    /// Vault-relative path in the letter case of the indexed record, when
    /// one matches case-insensitively and still exists on disk; otherwise the
    /// cleaned input.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` or `InvalidInput` for bad paths.
    pub fn canonical_path(&self, input: &str) -> VaultResult<String> {
        let requested = self.relative_path(input)?;
        let key = self.canonical_key(&requested);
        // Case-only renames on disk keep the caller's spelling.
        if key != requested
            && !self.absolute_path(&key)?.is_file()
            && self.absolute_path(&requested)?.is_file()
        {
            return Ok(requested);
        }
        Ok(key)
    }

    /// Re-read one file. Unchanged content is a no-op.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` or `InvalidInput` for bad paths.
    pub fn index_one(&mut self, path: &str) -> VaultResult<IndexOutcome> {
        let rel = self.canonical_path(path)?;
        let key = self.canonical_key(&rel);
        let abs = self.absolute_path(&rel)?;
        if !self.policy.admits_note(&rel) {
            return Ok(IndexOutcome::Skipped);
        }
        if !abs.is_file() {
            return Ok(if self.remove_record(&key) {
                IndexOutcome::Removed
            } else {
                IndexOutcome::Skipped
            });
        }

        let mtime = modified_ms(&abs);
        let doc = match read_note_file(&abs) {
            Ok(content) => {
                let hash = xxhash_rust::xxh3::xxh3_64(content.as_bytes());
                if self.docs.get(&key).is_some_and(|doc| doc.path == rel && doc.content_hash == hash) {
                    debug!("{key} unchanged");
                    return Ok(IndexOutcome::Unchanged);
                }
                parse_note(&rel, &content, mtime, self.preview_len)
            }
            Err(err) => {
                let Some(preview) = self.docs.get(&key).map(|doc| doc.preview.clone()) else {
                    warn!("{rel} unreadable ({err}); skipped");
                    return Ok(IndexOutcome::Skipped);
                };
                warn!("{rel} unreadable ({err}); keeping preview");
                self.fallback_document(&key, &preview, mtime)
            }
        };

        let existed = self.docs.remove(&key).is_some();
        self.docs.insert(doc.path.clone(), doc);
        self.commit();
        Ok(if existed {
            IndexOutcome::Updated
        } else {
            IndexOutcome::Inserted
        })
    }

    fn remove_record(&mut self, key: &str) -> bool {
        if self.docs.remove(key).is_some() {
            self.commit();
            true
        } else {
            false
        }
    }

    /// Drop a record without touching the disk.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` or `InvalidInput` for bad paths.
    pub fn remove(&mut self, path: &str) -> VaultResult<bool> {
        let rel = self.relative_path(path)?;
        let key = self.canonical_key(&rel);
        Ok(self.remove_record(&key))
    }

    /// Reindex files modified after `since_ms` and drop vanished records.
    ///
    /// # Errors
    /// Returns `RootMissing` when the root vanished.
    pub fn reindex_since(&mut self, since_ms: i64) -> VaultResult<ReindexSinceReport> {
        if !self.root.is_dir() {
            return Err(VaultError::RootMissing(self.root.clone()));
        }
        let files = scan_notes(&self.root, &self.policy);
        let mut report = ReindexSinceReport::default();
        let on_disk: std::collections::HashSet<&str> =
            files.iter().map(|file| file.rel_path.as_str()).collect();
        let vanished: Vec<String> = self
            .docs
            .keys()
            .filter(|path| !on_disk.contains(path.as_str()))
            .cloned()
            .collect();
        for path in vanished {
            self.docs.remove(&path);
            report.removed.push(path);
        }
        let mut changed = !report.removed.is_empty();
        for file in &files {
            let known = self.docs.contains_key(&file.rel_path);
            if known && file.modified_ms <= since_ms {
                continue;
            }
            let Ok(content) = read_note_file(&file.abs_path) else {
                warn!("{} unreadable during sweep", file.rel_path);
                continue;
            };
            let doc = parse_note(&file.rel_path, &content, file.modified_ms, self.preview_len);
            if self
                .docs
                .get(&file.rel_path)
                .is_some_and(|existing| existing.content_hash == doc.content_hash)
            {
                continue;
            }
            self.docs.insert(file.rel_path.clone(), doc);
            report.reindexed.push(file.rel_path.clone());
            changed = true;
        }
        if changed {
            self.commit();
        }
        report.revision = self.revision;
        Ok(report)
    }

    fn commit(&mut self) {
        self.path_index = self
            .docs
            .keys()
            .map(|path| (path.to_lowercase(), path.clone()))
            .collect();
        self.lookup = LookupTables::build(self.docs.values());
        self.backlinks = BacklinkIndex::build(self.docs.values(), &self.lookup);
        self.revision += 1;
        let snapshot = IndexSnapshot::capture(self.docs.values(), self.revision);
        if let Err(err) = write_snapshot(&self.snapshot_path, &snapshot) {
            warn!("index snapshot not persisted: {err}");
        }
    }
}
