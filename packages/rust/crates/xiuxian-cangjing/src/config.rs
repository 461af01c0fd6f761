//! Engine configuration.
//!
//! The engine itself never reads configuration files; hosts build an
//! [`EngineConfig`] (usually via [`EngineConfig::load`]) and hand it over.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::search::RankingProfile;

/// Environment variable consulted for the config file location.
pub const CONFIG_ENV_VAR: &str = "CANGJING_CONFIG";
/// Directory (relative to the vault root) for engine state files.
pub const STATE_DIR: &str = ".cangjing";

/// Path prefixes skipped by the vault scan unless overridden.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    ".git",
    ".obsidian",
    ".trash",
    ".cangjing",
    ".cache",
    "node_modules",
    "target",
];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vault root directory.
    pub root: PathBuf,
    /// Relative path prefixes excluded from scanning.
    pub excluded_prefixes: Vec<String>,
    /// Maximum scan depth below the root; `None` means unbounded.
    pub max_scan_depth: Option<usize>,
    /// Characters kept as a note preview.
    pub preview_len: usize,
    /// Characters per search snippet window.
    pub snippet_len: usize,
    /// Default search result limit.
    pub search_limit: usize,
    /// Fuzzy acceptance threshold (scores strictly below pass).
    pub fuzzy_threshold: f64,
    /// Base results scoring below this pull in linked notes.
    pub link_augment_threshold: f64,
    /// Default ranking profile.
    pub ranking_profile: RankingProfile,
    /// Search cache capacity.
    pub search_cache_size: usize,
    /// Search cache time-to-live in seconds.
    pub search_cache_ttl_secs: u64,
    /// Heavy-operation cache capacity.
    pub heavy_cache_size: usize,
    /// Quiet period before a changed file is reindexed.
    pub reindex_debounce_ms: u64,
    /// Index snapshot location; defaults under [`STATE_DIR`].
    pub index_snapshot_path: Option<PathBuf>,
    /// Extra synonym groups merged into the built-in dictionary.
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// Stemmer names to enable in addition to the built-in suffix stemmer.
    pub stemmers: Vec<String>,
    /// Folder holding daily journal notes.
    pub journal_dir: String,
    /// Folder receiving captured notes.
    pub capture_dir: String,
    /// Relation fields seeded (empty) on captured notes.
    pub capture_relations: Vec<String>,
    /// Semantic store settings.
    pub semantic: SemanticConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
            max_scan_depth: None,
            preview_len: 300,
            snippet_len: 200,
            search_limit: 20,
            fuzzy_threshold: 0.35,
            link_augment_threshold: 0.2,
            ranking_profile: RankingProfile::Balanced,
            search_cache_size: 100,
            search_cache_ttl_secs: 300,
            heavy_cache_size: 50,
            reindex_debounce_ms: 500,
            index_snapshot_path: None,
            synonyms: BTreeMap::new(),
            stemmers: Vec::new(),
            journal_dir: "Journal".to_string(),
            capture_dir: "Inbox".to_string(),
            capture_relations: vec!["related".to_string()],
            semantic: SemanticConfig::default(),
        }
    }
}

/// Semantic store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// When false, semantic queries fall back to lexical search.
    pub enabled: bool,
    /// Registered provider name; unknown names fall back to `hash`.
    pub provider: String,
    /// Weight of cosine similarity in the blended score.
    pub alpha: f64,
    /// Alpha used for queries with at most two significant words.
    pub short_query_alpha: f64,
    /// Maximum notes scanned per query.
    pub scan_budget: usize,
    /// Embedding snapshot location; defaults under [`STATE_DIR`].
    pub snapshot_path: Option<PathBuf>,
    /// Copy the previous snapshot to `.bak` before overwriting.
    pub backup: bool,
    /// Lower bound of the save debounce window.
    pub save_debounce_ms: u64,
    /// Notes with fewer body characters are never embedded.
    pub min_content_len: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "hash".to_string(),
            alpha: 0.7,
            short_query_alpha: 0.5,
            scan_budget: 2000,
            snapshot_path: None,
            backup: true,
            save_debounce_ms: 600,
            min_content_len: 20,
        }
    }
}

impl EngineConfig {
    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parse YAML text.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidInput`] when the YAML is malformed or fails validation.
    pub fn from_yaml_str(text: &str) -> VaultResult<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|err| VaultError::invalid(format!("config parse failed: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    ///
    /// # Errors
    /// Returns IO or parse failures.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| VaultError::io(path, err))?;
        Self::from_yaml_str(&text)
    }

    /// Reject out-of-range settings.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> VaultResult<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(VaultError::invalid("fuzzy_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.link_augment_threshold) {
            return Err(VaultError::invalid(
                "link_augment_threshold must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.semantic.alpha)
            || !(0.0..=1.0).contains(&self.semantic.short_query_alpha)
        {
            return Err(VaultError::invalid("semantic alpha must be within [0, 1]"));
        }
        if self.search_cache_size == 0 || self.heavy_cache_size == 0 {
            return Err(VaultError::invalid("cache sizes must be at least 1"));
        }
        if self.snippet_len < 20 {
            return Err(VaultError::invalid("snippet_len must be at least 20"));
        }
        Ok(())
    }

    /// Effective index snapshot path.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.index_snapshot_path
            .clone()
            .unwrap_or_else(|| self.root.join(STATE_DIR).join("index.json"))
    }

    /// Effective embedding snapshot path.
    #[must_use]
    pub fn embedding_path(&self) -> PathBuf {
        self.semantic
            .snapshot_path
            .clone()
            .unwrap_or_else(|| self.root.join(STATE_DIR).join("embeddings.json"))
    }
}

/// Locate the config file: explicit path, then `$CANGJING_CONFIG`, then the
/// per-user config directory.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR)
        && !raw.trim().is_empty()
    {
        return Some(PathBuf::from(raw.trim()));
    }
    let candidate = dirs::config_dir()?.join("cangjing").join("cangjing.yaml");
    candidate.is_file().then_some(candidate)
}
