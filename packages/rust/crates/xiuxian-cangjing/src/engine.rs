//! Engine context: owns the store, caches, semantic layer and debounce timers.
//!
//! One `Engine` is built per vault and passed to every operation handler. All
//! state is mutated from the caller's single control flow; deferred work is
//! driven by [`Engine::tick`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheLayer, CacheStats, HeavyKey};
use crate::config::EngineConfig;
use crate::error::{VaultError, VaultResult};
use crate::graph::{
    DirectoryNode, FolderContents, GraphSnapshot, LinkGraph, Neighborhood, NeighborhoodRequest,
    PathRequest, Relations, ShortestPath, SnapshotRequest, TreeRequest, dangling_refs,
    directory_tree, folder_contents, graph_snapshot, neighborhood, relations_of, shortest_path,
};
use crate::note::{IndexOutcome, LoadReport, NoteStore, ReindexSinceReport, Resolution};
use crate::persist::atomic_write_text;
use crate::schedule::{DebounceScheduler, SharedClock, system_clock};
use crate::search::{RankingProfile, SearchEngine, SearchOptions, SearchResponse, Stemmer, normalize_query_key};
use crate::semantic::{
    BuildIndexReport, ProviderFactory, ProviderRegistry, SemanticQuery, SemanticResponse,
    SemanticStore,
};

/// Deferred work completed by one [`Engine::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Paths whose debounced reindex changed the store.
    pub reindexed: Vec<String>,
    /// Paths re-read without a content change.
    pub unchanged: Vec<String>,
    /// Whether the embedding snapshot was written.
    pub embeddings_saved: bool,
}

impl TickReport {
    /// Nothing happened.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.reindexed.is_empty() && self.unchanged.is_empty() && !self.embeddings_saved
    }
}

/// Result of `get-content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteContent {
    /// Canonical path.
    pub path: String,
    /// Note title.
    pub title: String,
    /// Raw file text, front matter included.
    pub content: String,
    /// Parsed front matter.
    pub frontmatter: serde_json::Map<String, serde_json::Value>,
    /// Tags.
    pub tags: Vec<String>,
    /// Aliases.
    pub aliases: Vec<String>,
    /// Modification time (ms since epoch).
    pub modified_ms: i64,
}

/// Index-wide counters for `stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Indexed notes.
    pub documents: usize,
    /// Resolved edges.
    pub edges: usize,
    /// Notes with no links in either direction.
    pub orphans: usize,
    /// References that resolve to nothing.
    pub dangling: usize,
    /// Current revision.
    pub revision: u64,
    /// Search cache entries.
    pub search_cache_entries: usize,
    /// Search cache capacity.
    pub search_cache_capacity: usize,
    /// Heavy cache entries.
    pub heavy_cache_entries: usize,
    /// Stored vectors.
    pub vectors: usize,
    /// Active embedding provider.
    pub provider: String,
    /// Semantic scoring enabled.
    pub semantic_enabled: bool,
    /// Paths waiting for a debounced reindex.
    pub pending_reindex: usize,
}

/// Builder for [`Engine`] with injectable clock, stemmers and providers.
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Option<SharedClock>,
    stemmers: Vec<Arc<dyn Stemmer>>,
    providers: ProviderRegistry,
}

impl EngineBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: None,
            stemmers: Vec::new(),
            providers: ProviderRegistry::default(),
        }
    }

    /// Drive caches and timers from `clock`.
    #[must_use]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a stemmer ahead of the suffix-table fallback.
    #[must_use]
    pub fn stemmer(mut self, stemmer: Arc<dyn Stemmer>) -> Self {
        self.stemmers.push(stemmer);
        self
    }

    /// Register an embedding provider factory.
    #[must_use]
    pub fn provider(mut self, name: &str, factory: ProviderFactory) -> Self {
        self.providers.register(name, factory);
        self
    }

    /// Validate the configuration, load the vault and the embedding snapshot.
    ///
    /// # Errors
    /// Returns `InvalidInput` for bad settings and `RootMissing` when the root is absent.
    pub fn build(self) -> VaultResult<Engine> {
        self.config.validate()?;
        let clock = self.clock.unwrap_or_else(system_clock);
        let mut store = NoteStore::open(&self.config)?;
        store.load_all()?;

        let mut search = SearchEngine::new(&self.config);
        for stemmer in self.stemmers {
            search.register_stemmer(stemmer);
        }
        let provider = self.providers.select(&self.config.semantic.provider);
        let mut semantic = SemanticStore::load(
            self.config.semantic.clone(),
            self.config.embedding_path(),
            provider,
        );
        semantic.retain_indexed(&store);

        let caches = CacheLayer::new(&self.config, Arc::clone(&clock));
        let reindex_timers = DebounceScheduler::new(
            Duration::from_millis(self.config.reindex_debounce_ms),
            Arc::clone(&clock),
        );
        let embedding_timer = DebounceScheduler::new(
            Duration::from_millis(self.config.semantic.save_debounce_ms),
            Arc::clone(&clock),
        );
        let seen_revision = store.revision();
        info!(
            "engine ready: {} notes under {}",
            store.len(),
            store.root().display()
        );
        Ok(Engine {
            config: self.config,
            clock,
            store,
            search,
            caches,
            semantic,
            reindex_timers,
            embedding_timer,
            seen_revision,
        })
    }
}

/// Vault engine context.
pub struct Engine {
    pub(crate) config: EngineConfig,
    clock: SharedClock,
    pub(crate) store: NoteStore,
    search: SearchEngine,
    caches: CacheLayer,
    pub(crate) semantic: SemanticStore,
    reindex_timers: DebounceScheduler<String>,
    embedding_timer: DebounceScheduler<()>,
    seen_revision: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.store.root())
            .field("documents", &self.store.len())
            .field("revision", &self.store.revision())
            .field("semantic", &self.semantic)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build with defaults for everything but the configuration.
    ///
    /// # Errors
    /// See [`EngineBuilder::build`].
    pub fn open(config: EngineConfig) -> VaultResult<Self> {
        EngineBuilder::new(config).build()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Note store.
    #[must_use]
    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    /// Current index revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Cache occupancy.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    /// Semantic layer.
    #[must_use]
    pub fn semantic(&self) -> &SemanticStore {
        &self.semantic
    }

    /// Graph view over the current store.
    #[must_use]
    pub fn link_graph(&self) -> LinkGraph<'_> {
        LinkGraph::new(&self.store)
    }

    /// Clear both caches when the revision moved since the last read.
    fn sync_revision(&mut self) {
        let revision = self.store.revision();
        if revision != self.seen_revision {
            debug!("revision {} -> {revision}; caches cleared", self.seen_revision);
            self.caches.clear();
            self.seen_revision = revision;
        }
    }

    pub(crate) fn schedule_embedding_save(&mut self) {
        if self.semantic.is_dirty() {
            self.embedding_timer.schedule(());
        }
    }

    /// Bookkeeping after any note under `paths` changed on disk or in the store.
    pub(crate) fn after_change(&mut self, paths: &[&str]) {
        for path in paths {
            self.semantic.invalidate(path);
        }
        self.sync_revision();
        self.schedule_embedding_save();
    }

    /// Write `content` to a vault-relative path and re-derive the note now.
    pub(crate) fn write_through(&mut self, rel: &str, content: &str) -> VaultResult<IndexOutcome> {
        let abs = self.store.absolute_path(rel)?;
        atomic_write_text(&abs, content)?;
        self.reindex_timers.cancel(&rel.to_string());
        let outcome = self.store.index_one(rel)?;
        self.after_change(&[rel]);
        Ok(outcome)
    }

    /// Raw text of an indexed note.
    pub(crate) fn read_note(&self, rel: &str) -> VaultResult<String> {
        let abs = self.store.absolute_path(rel)?;
        std::fs::read_to_string(&abs).map_err(|err| VaultError::io(&abs, err))
    }

    /// Full text and metadata of a note.
    ///
    /// # Errors
    /// Returns `NotFound` when the reference does not resolve and `Io` when the file is unreadable.
    pub fn get_content(&self, note: &str) -> VaultResult<NoteContent> {
        let doc = self.store.require(note)?;
        let content = self.read_note(&doc.path)?;
        Ok(NoteContent {
            path: doc.path.clone(),
            title: doc.title.clone(),
            content,
            frontmatter: doc.frontmatter.clone(),
            tags: doc.tags.clone(),
            aliases: doc.aliases.clone(),
            modified_ms: doc.modified_ms,
        })
    }

    /// Resolve a reference to a canonical path.
    #[must_use]
    pub fn resolve(&self, input: &str) -> Resolution {
        self.store.resolve(input)
    }

    /// Cached full-text search.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty query.
    pub fn search(
        &mut self,
        query: &str,
        limit: Option<usize>,
        profile: Option<RankingProfile>,
    ) -> VaultResult<SearchResponse> {
        self.sync_revision();
        let options = SearchOptions {
            limit: limit.unwrap_or(self.config.search_limit).max(1),
            profile: profile.unwrap_or(self.config.ranking_profile),
        };
        let key = normalize_query_key(query, &options);
        if let Some(cached) = self.caches.search.get(&key) {
            debug!("search cache hit: {query}");
            return Ok(cached);
        }
        let response = self.search.search(&self.store, query, &options)?;
        self.caches.search.insert(key, response.clone());
        Ok(response)
    }

    /// Run `compute` through the revision-keyed heavy cache.
    fn heavy<T, A, F>(&mut self, operation: &str, arguments: &A, compute: F) -> VaultResult<T>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize,
        F: FnOnce(&LinkGraph<'_>) -> T,
    {
        self.sync_revision();
        let key = HeavyKey::new(operation, &serde_json::to_value(arguments)?, self.store.revision());
        if let Some(cached) = self.caches.heavy.get(&key) {
            debug!("heavy cache hit: {operation}");
            return Ok(serde_json::from_value(cached.clone())?);
        }
        let graph = LinkGraph::new(&self.store);
        let result = compute(&graph);
        self.caches.heavy.insert(key, serde_json::to_value(&result)?);
        Ok(result)
    }

    /// Links touching one note.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn relations_of(&mut self, note: &str) -> VaultResult<Relations> {
        self.heavy("relations-of", &note, |graph| relations_of(graph, note))
    }

    /// Layered neighborhood.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn neighborhood(&mut self, request: &NeighborhoodRequest) -> VaultResult<Neighborhood> {
        self.heavy("neighborhood", request, |graph| neighborhood(graph, request))
    }

    /// Shortest path between two notes.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn shortest_path(&mut self, request: &PathRequest) -> VaultResult<ShortestPath> {
        self.heavy("shortest-path", request, |graph| shortest_path(graph, request))
    }

    /// Ego or folder subgraph.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn graph_snapshot(&mut self, request: &SnapshotRequest) -> VaultResult<GraphSnapshot> {
        self.heavy("graph-snapshot", request, |graph| graph_snapshot(graph, request))
    }

    /// Folder aggregation tree.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn directory_tree(&mut self, request: &TreeRequest) -> VaultResult<DirectoryNode> {
        self.heavy("directory-tree", request, |graph| directory_tree(graph.store(), request))
    }

    /// Direct children of a folder.
    ///
    /// # Errors
    /// Returns serialization failures of the cache layer.
    pub fn folder_contents(&mut self, folder: &str) -> VaultResult<FolderContents> {
        self.heavy("folder-contents", &folder, |graph| folder_contents(graph.store(), folder))
    }

    /// Full rescan.
    ///
    /// # Errors
    /// Returns `RootMissing` when the root vanished.
    pub fn reindex_all(&mut self) -> VaultResult<LoadReport> {
        let report = self.store.load_all()?;
        self.reindex_timers.flush();
        self.semantic.retain_indexed(&self.store);
        self.after_change(&[]);
        Ok(report)
    }

    /// Re-read one file now.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` or `InvalidInput` for bad paths.
    pub fn reindex_one(&mut self, path: &str) -> VaultResult<IndexOutcome> {
        let rel = self.store.canonical_path(path)?;
        self.reindex_timers.cancel(&rel);
        let outcome = self.store.index_one(&rel)?;
        if !matches!(outcome, IndexOutcome::Unchanged | IndexOutcome::Skipped) {
            self.after_change(&[rel.as_str()]);
        }
        Ok(outcome)
    }

    /// Re-read files modified after `since_ms`.
    ///
    /// # Errors
    /// Returns `RootMissing` when the root vanished.
    pub fn reindex_since(&mut self, since_ms: i64) -> VaultResult<ReindexSinceReport> {
        let report = self.store.reindex_since(since_ms)?;
        let touched: Vec<&str> = report
            .reindexed
            .iter()
            .chain(&report.removed)
            .map(String::as_str)
            .collect();
        self.after_change(&touched);
        Ok(report)
    }

    /// Record an external change; the reindex runs after the debounce window.
    /// Returns true when an earlier pending notification was replaced.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` or `InvalidInput` for bad paths.
    pub fn notify_changed(&mut self, path: &str) -> VaultResult<bool> {
        let rel = self.store.canonical_path(path)?;
        self.store.absolute_path(&rel)?;
        Ok(self.reindex_timers.schedule(rel))
    }

    /// Paths waiting for a debounced reindex.
    #[must_use]
    pub fn pending_reindex(&self) -> usize {
        self.reindex_timers.len()
    }

    /// Earliest pending deadline of either timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (
            self.reindex_timers.next_deadline(),
            self.embedding_timer.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run deferred work whose debounce window has elapsed.
    pub fn tick(&mut self) -> TickReport {
        let due = self.reindex_timers.take_due();
        let save = !self.embedding_timer.take_due().is_empty();
        self.run_deferred(due, save)
    }

    /// Run all deferred work immediately, as on shutdown.
    pub fn flush(&mut self) -> TickReport {
        let due = self.reindex_timers.flush();
        self.embedding_timer.flush();
        let save = self.semantic.is_dirty();
        self.run_deferred(due, save)
    }

    fn run_deferred(&mut self, due: Vec<String>, save: bool) -> TickReport {
        let mut report = TickReport::default();
        for path in due {
            match self.store.index_one(&path) {
                Ok(IndexOutcome::Unchanged | IndexOutcome::Skipped) => report.unchanged.push(path),
                Ok(outcome) => {
                    debug!("debounced reindex of {path}: {outcome:?}");
                    self.after_change(&[path.as_str()]);
                    report.reindexed.push(path);
                }
                Err(err) => warn!("debounced reindex of {path} failed: {err}"),
            }
        }
        if save {
            match self.semantic.save() {
                Ok(written) => report.embeddings_saved = written,
                Err(err) => {
                    warn!("embedding snapshot not saved: {err}");
                    self.embedding_timer.schedule(());
                }
            }
        }
        report
    }

    /// Semantic query, degrading to lexical search when disabled.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty query.
    pub fn semantic_query(&mut self, request: &SemanticQuery) -> VaultResult<SemanticResponse> {
        if !self.semantic.is_enabled() {
            let limit = request.offset.saturating_add(request.top_k).max(1);
            let lexical = self.search(&request.query, Some(limit), None)?;
            return Ok(SemanticResponse::from_lexical(request, &lexical));
        }
        let response = self.semantic.query(&self.store, request)?;
        self.schedule_embedding_save();
        Ok(response)
    }

    /// Store a supplied vector, or embed the note now.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes and `InvalidInput` for wrong dimensions.
    pub fn embed_upsert(&mut self, note: &str, vector: Option<Vec<f32>>) -> VaultResult<(String, usize)> {
        let doc = self.store.require(note)?;
        let path = doc.path.clone();
        let dimension = self.semantic.upsert(doc, vector)?;
        self.schedule_embedding_save();
        Ok((path, dimension))
    }

    /// Warm the vector table.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn semantic_build_index(&mut self, limit: Option<usize>) -> VaultResult<BuildIndexReport> {
        let report = self.semantic.build_index(&self.store, limit)?;
        self.schedule_embedding_save();
        Ok(report)
    }

    /// Index-wide counters.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let graph = LinkGraph::new(&self.store);
        let lookup = self.store.lookup();
        let mut edges = 0usize;
        let mut orphans = 0usize;
        let mut dangling = 0usize;
        for doc in self.store.documents() {
            let outgoing = graph.outgoing(&doc.path).len();
            edges += outgoing;
            dangling += dangling_refs(doc, lookup).len();
            if outgoing == 0 && self.store.backlinks().in_degree(&doc.path) == 0 {
                orphans += 1;
            }
        }
        let cache = self.caches.stats();
        IndexStats {
            documents: self.store.len(),
            edges,
            orphans,
            dangling,
            revision: self.store.revision(),
            search_cache_entries: cache.search_entries,
            search_cache_capacity: cache.search_capacity,
            heavy_cache_entries: cache.heavy_entries,
            vectors: self.semantic.len(),
            provider: self.semantic.provider_name().to_string(),
            semantic_enabled: self.semantic.is_enabled(),
            pending_reindex: self.reindex_timers.len(),
        }
    }

    /// Clock driving caches and timers.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }
}
