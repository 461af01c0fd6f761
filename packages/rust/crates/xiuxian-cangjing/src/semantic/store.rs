//! Vector table plus hybrid lexical/cosine ranking.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::persistence::{VectorTable, load_vectors, save_vectors};
use super::provider::{EmbeddingProvider, cosine_similarity};
use crate::config::SemanticConfig;
use crate::error::{VaultError, VaultResult};
use crate::note::parser::{tokenize, truncate_chars};
use crate::note::{NoteDocument, NoteStore};
use crate::search::{ResultType, SearchResponse};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with", "и", "в", "во", "на", "с", "со", "по", "к", "о", "об", "из", "для",
    "не", "что", "это",
];
const SEMANTIC_PREVIEW_CHARS: usize = 160;

/// Restrictions applied before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticFilters {
    /// Keep notes whose path starts with this prefix.
    pub path_prefix: Option<String>,
    /// Keep notes carrying every listed tag.
    pub tags: Vec<String>,
    /// Keep notes with this front matter `type`.
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

impl SemanticFilters {
    fn admits(&self, doc: &NoteDocument) -> bool {
        if let Some(prefix) = &self.path_prefix
            && !doc.path_lower.starts_with(&prefix.trim_start_matches('/').to_lowercase())
        {
            return false;
        }
        if let Some(doc_type) = &self.doc_type
            && !doc
                .doc_type
                .as_deref()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(doc_type))
        {
            return false;
        }
        self.tags.iter().all(|wanted| {
            let wanted = wanted.trim_start_matches('#');
            doc.tags.iter().any(|tag| tag.eq_ignore_ascii_case(wanted))
        })
    }
}

fn default_top_k() -> usize {
    10
}

/// Arguments of a semantic query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticQuery {
    /// Free text.
    pub query: String,
    /// Page size.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Rows skipped before the page.
    #[serde(default)]
    pub offset: usize,
    /// Pre-scoring filters.
    #[serde(default)]
    pub filters: SemanticFilters,
}

impl SemanticQuery {
    /// First page of `query` with default size and no filters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            offset: 0,
            filters: SemanticFilters::default(),
        }
    }
}

/// How a semantic response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticMode {
    /// Blended cosine and lexical scoring.
    Semantic,
    /// Semantic layer disabled; lexical search results relabelled.
    Fallback,
}

/// One semantic result (higher score is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    /// Note path.
    pub path: String,
    /// Note title.
    pub title: String,
    /// Blended score.
    pub score: f64,
    /// Cosine component.
    pub cosine: f64,
    /// Lexical component.
    pub lexical: f64,
    /// Short body preview.
    pub preview: String,
    /// `semantic` or `fallback`.
    pub result_type: ResultType,
}

/// Semantic query output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticResponse {
    /// Query as supplied.
    pub query: String,
    /// Scoring mode.
    pub mode: SemanticMode,
    /// Blend ratio used; absent in fallback mode.
    pub alpha: Option<f64>,
    /// Notes scored before the budget stopped the scan.
    pub scanned: usize,
    /// Rows available before paging.
    pub total: usize,
    /// Requested page.
    pub results: Vec<SemanticHit>,
}

impl SemanticResponse {
    /// Relabel a lexical response as fallback rows; fuzzy scores are inverted so higher is better.
    #[must_use]
    pub fn from_lexical(request: &SemanticQuery, response: &SearchResponse) -> Self {
        let total = response.results.len();
        let results = response
            .results
            .iter()
            .skip(request.offset)
            .take(request.top_k)
            .map(|hit| SemanticHit {
                path: hit.path.clone(),
                title: hit.title.clone(),
                score: (1.0 - hit.score).clamp(0.0, 1.0),
                cosine: 0.0,
                lexical: (1.0 - hit.score).clamp(0.0, 1.0),
                preview: hit.snippet.clone(),
                result_type: ResultType::Fallback,
            })
            .collect();
        Self {
            query: request.query.clone(),
            mode: SemanticMode::Fallback,
            alpha: None,
            scanned: total,
            total,
            results,
        }
    }
}

/// Warm-up summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIndexReport {
    /// Vectors computed now.
    pub generated: usize,
    /// Vectors already present.
    pub cached: usize,
    /// Notes under the minimum content length.
    pub skipped: usize,
    /// Vectors held after the build.
    pub total: usize,
    /// Wall time.
    pub elapsed_ms: u64,
    /// Active provider.
    pub provider: String,
}

/// Significant query words: tokens of at least two chars that are not stopwords.
#[must_use]
pub fn significant_words(query: &str) -> Vec<String> {
    tokenize(query)
        .into_iter()
        .filter(|word| word.chars().count() >= 2 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn hit_ratio(words: &[String], haystack: &str) -> f64 {
    let hits = words.iter().filter(|word| haystack.contains(word.as_str())).count();
    hits as f64 / words.len() as f64
}

/// Lexical relevance in `[0, 1]`: weighted word hits across title, body and path plus phrase boosts.
#[must_use]
pub fn lexical_relevance(doc: &NoteDocument, query: &str) -> f64 {
    let words = significant_words(query);
    if words.is_empty() {
        return 0.0;
    }
    let (title_weight, body_weight, path_weight) = if words.len() <= 2 {
        (0.5, 0.3, 0.2)
    } else {
        (0.3, 0.5, 0.2)
    };
    let mut score = title_weight * hit_ratio(&words, &doc.title_lower)
        + body_weight * hit_ratio(&words, &doc.body_lower)
        + path_weight * hit_ratio(&words, &doc.path_lower);
    let phrase = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if words.len() > 1 {
        if doc.title_lower.contains(&phrase) {
            score += 0.2;
        }
        if doc.body_lower.contains(&phrase) {
            score += 0.1;
        }
    }
    score.min(1.0)
}

fn embedding_text(doc: &NoteDocument) -> String {
    format!("{}\n{}", doc.title, doc.body)
}

/// Path-keyed embeddings with a dirty flag for debounced persistence.
pub struct SemanticStore {
    config: SemanticConfig,
    snapshot_path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    vectors: VectorTable,
    dirty: bool,
}

impl std::fmt::Debug for SemanticStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticStore")
            .field("provider", &self.provider.name())
            .field("vectors", &self.vectors.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl SemanticStore {
    /// Load the snapshot at `snapshot_path`, dropping vectors of the wrong dimension.
    pub fn load(
        config: SemanticConfig,
        snapshot_path: PathBuf,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let mut vectors = load_vectors(&snapshot_path);
        let dimension = provider.dimension();
        let before = vectors.len();
        vectors.retain(|_, vector| vector.len() == dimension);
        if vectors.len() < before {
            warn!(
                "dropped {} stored vectors not matching dimension {dimension}",
                before - vectors.len()
            );
        }
        info!("loaded {} vectors ({})", vectors.len(), provider.name());
        Self {
            config,
            snapshot_path,
            provider,
            vectors,
            dirty: false,
        }
    }

    /// Whether semantic scoring is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Active provider name.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Unsaved changes pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stored vector count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// No vectors stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Stored vector for `path`.
    #[must_use]
    pub fn vector(&self, path: &str) -> Option<&[f32]> {
        self.vectors.get(path).map(Vec::as_slice)
    }

    /// Cached vector for `doc`, generating and marking dirty when absent.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn ensure_vector(&mut self, doc: &NoteDocument) -> VaultResult<&[f32]> {
        if !self.vectors.contains_key(&doc.path) {
            let vector = self.provider.embed(&embedding_text(doc))?;
            self.vectors.insert(doc.path.clone(), vector);
            self.dirty = true;
        }
        self.vectors
            .get(&doc.path)
            .map(Vec::as_slice)
            .ok_or_else(|| VaultError::Provider(format!("vector for {} vanished", doc.path)))
    }

    /// Store a caller-supplied vector, or embed `doc` when none is given.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the vector has the wrong dimension.
    pub fn upsert(&mut self, doc: &NoteDocument, vector: Option<Vec<f32>>) -> VaultResult<usize> {
        let vector = match vector {
            Some(mut vector) => {
                if vector.len() != self.provider.dimension() {
                    return Err(VaultError::invalid(format!(
                        "vector has {} dimensions, expected {}",
                        vector.len(),
                        self.provider.dimension()
                    )));
                }
                super::provider::l2_normalize(&mut vector);
                vector
            }
            None => self.provider.embed(&embedding_text(doc))?,
        };
        let dimension = vector.len();
        self.vectors.insert(doc.path.clone(), vector);
        self.dirty = true;
        Ok(dimension)
    }

    /// Forget the vector of `path`.
    pub fn invalidate(&mut self, path: &str) -> bool {
        let removed = self.vectors.remove(path).is_some();
        self.dirty |= removed;
        removed
    }

    /// Move a vector to a new key.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(vector) = self.vectors.remove(from) {
            self.vectors.insert(to.to_string(), vector);
            self.dirty = true;
        }
    }

    /// Drop vectors for notes no longer indexed.
    pub fn retain_indexed(&mut self, store: &NoteStore) {
        let before = self.vectors.len();
        self.vectors.retain(|path, _| store.get(path).is_some());
        if self.vectors.len() != before {
            self.dirty = true;
        }
    }

    fn blend_alpha(&self, query: &str) -> f64 {
        if significant_words(query).len() <= 2 {
            self.config.short_query_alpha
        } else {
            self.config.alpha
        }
    }

    fn long_enough(&self, doc: &NoteDocument) -> bool {
        doc.body.trim().chars().count() >= self.config.min_content_len
    }

    /// Hybrid query over indexed notes. Callers handle the disabled case.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty query; propagates provider failures.
    pub fn query(&mut self, store: &NoteStore, request: &SemanticQuery) -> VaultResult<SemanticResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(VaultError::invalid("query must not be empty"));
        }
        let query_vector = self.provider.embed(query)?;
        let alpha = self.blend_alpha(query);

        let mut scanned = 0usize;
        let mut scored: Vec<SemanticHit> = Vec::new();
        for doc in store.documents() {
            if scanned >= self.config.scan_budget {
                debug!("semantic scan budget {} reached", self.config.scan_budget);
                break;
            }
            if !request.filters.admits(doc) || !self.long_enough(doc) {
                continue;
            }
            scanned += 1;
            let cosine = f64::from(cosine_similarity(&query_vector, self.ensure_vector(doc)?));
            let lexical = lexical_relevance(doc, query);
            scored.push(SemanticHit {
                path: doc.path.clone(),
                title: doc.title.clone(),
                score: alpha * cosine + (1.0 - alpha) * lexical,
                cosine,
                lexical,
                preview: truncate_chars(&doc.preview, SEMANTIC_PREVIEW_CHARS),
                result_type: ResultType::Semantic,
            });
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        let total = scored.len();
        let results = scored
            .into_iter()
            .skip(request.offset)
            .take(request.top_k.max(1))
            .collect();
        Ok(SemanticResponse {
            query: request.query.clone(),
            mode: SemanticMode::Semantic,
            alpha: Some(alpha),
            scanned,
            total,
            results,
        })
    }

    /// Compute vectors for up to `limit` notes above the minimum length.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn build_index(&mut self, store: &NoteStore, limit: Option<usize>) -> VaultResult<BuildIndexReport> {
        let started = Instant::now();
        let mut report = BuildIndexReport {
            provider: self.provider.name().to_string(),
            ..BuildIndexReport::default()
        };
        let limit = limit.unwrap_or(usize::MAX);
        for doc in store.documents() {
            if !self.long_enough(doc) {
                report.skipped += 1;
                continue;
            }
            if report.generated + report.cached >= limit {
                break;
            }
            if self.vectors.contains_key(&doc.path) {
                report.cached += 1;
            } else {
                self.ensure_vector(doc)?;
                report.generated += 1;
            }
        }
        report.total = self.vectors.len();
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "semantic index: {} generated, {} cached, {} skipped",
            report.generated, report.cached, report.skipped
        );
        Ok(report)
    }

    /// Persist when dirty. Returns whether a write happened.
    ///
    /// # Errors
    /// Returns IO or serialization failures; the store stays dirty.
    pub fn save(&mut self) -> VaultResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        save_vectors(&self.snapshot_path, &self.vectors, self.config.backup)?;
        self.dirty = false;
        info!("saved {} vectors to {}", self.vectors.len(), self.snapshot_path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_do_not_count_as_significant() {
        assert_eq!(significant_words("the graph of notes"), vec!["graph", "notes"]);
        assert!(significant_words("a I").is_empty());
    }
}
