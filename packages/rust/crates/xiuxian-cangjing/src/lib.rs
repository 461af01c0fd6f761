//! xiuxian-cangjing - Linked-note knowledge base engine.
//!
//! Turns a directory of markdown notes into a queryable knowledge base:
//! - Fuzzy, operator-rich full-text search with synonym and stem expansion
//! - Bidirectional link graph from `[[wikilinks]]`, markdown links and front matter relations
//! - Neighborhood, shortest-path, subgraph and directory-tree queries
//! - Optional semantic layer blending cosine similarity with lexical relevance
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Host (cangjing binary, stdio JSON lines)                │
//! └──────────────────────────────────────────────────────────┘
//!                          │ execute(op, args)
//!                          ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Engine                                                   │
//! │  - NoteStore (scan, index, resolve, snapshot)            │
//! │  - SearchEngine + search cache (TTL, least-hit eviction) │
//! │  - LinkGraph queries + heavy cache (revision keyed)      │
//! │  - SemanticStore (pluggable embedding provider)          │
//! │  - Debounce schedulers (reindex, embedding save)         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use serde_json::json;
//! use xiuxian_cangjing::{Engine, EngineConfig};
//!
//! let mut engine = Engine::open(EngineConfig::with_root("notes"))?;
//! let hits = engine.execute("search", json!({ "query": "graph tag:rust" }));
//! # Ok::<(), xiuxian_cangjing::VaultError>(())
//! ```

// ============================================================================
// Core modules
// ============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod note;
pub mod ops;
pub mod persist;
pub mod schedule;
pub mod search;
pub mod semantic;

mod engine;

// ============================================================================
// Public exports
// ============================================================================

pub use config::{CONFIG_ENV_VAR, EngineConfig, SemanticConfig, resolve_config_path};
pub use engine::{Engine, EngineBuilder, IndexStats, NoteContent, TickReport};
pub use error::{FailureKind, OperationFailure, VaultError, VaultResult};
pub use graph::{Direction, LinkGraph};
pub use note::{NoteDocument, NoteStore, Resolution};
pub use ops::OPERATIONS;
pub use schedule::{Clock, DebounceScheduler, ManualClock, SharedClock, SystemClock};
pub use search::{RankingProfile, SearchHit, SearchResponse};
pub use semantic::{EmbeddingProvider, HashEmbeddingProvider, SemanticQuery, SemanticResponse};
