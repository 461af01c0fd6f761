use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::category::{Category, classify};
use super::expand::{SynonymDictionary, expand_query};
use super::fuzzy::{RankingProfile, passes_threshold, score_document};
use super::query::{ParsedQuery, matches_predicate, parse_query};
use super::snippet::{extract_snippet, highlight, highlight_pattern};
use super::stemmer::{Stemmer, StemmerRegistry};
use crate::config::EngineConfig;
use crate::error::{VaultError, VaultResult};
use crate::graph::LinkGraph;
use crate::note::parser::tokenize;
use crate::note::{NoteDocument, NoteStore};

const AUGMENT_MAX_SOURCES: usize = 2;
const AUGMENT_SCORE_FACTOR: f64 = 0.7;

/// Origin of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Direct fuzzy or filter match.
    Base,
    /// One-hop neighbor of a strong base result.
    Linked,
    /// Lexical result served for a disabled semantic layer.
    Fallback,
    /// Vector-blended result.
    Semantic,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Note path.
    pub path: String,
    /// Highlighted title.
    pub title: String,
    /// `[Category] ` prefixed, highlighted description.
    pub description: String,
    /// Highlighted body window.
    pub snippet: String,
    /// Fuzzy score (0 is best).
    pub score: f64,
    /// Heuristic category.
    pub category: Category,
    /// Result origin.
    pub result_type: ResultType,
    /// Base result that pulled in a linked row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_from: Option<String>,
    /// Note tags.
    pub tags: Vec<String>,
}

/// Full pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Query as supplied.
    pub query: String,
    /// Parsed predicate.
    pub parsed: ParsedQuery,
    /// Ranking profile used.
    pub profile: RankingProfile,
    /// Result limit.
    pub limit: usize,
    /// Candidates that passed the fuzzy threshold (or the corpus size for filter-only queries).
    pub total_candidates: usize,
    /// Grouped results.
    pub results: Vec<SearchHit>,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum base results.
    pub limit: usize,
    /// Field weighting.
    pub profile: RankingProfile,
}

/// Ranking pipeline; stateless apart from its dictionaries.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    stemmers: StemmerRegistry,
    synonyms: SynonymDictionary,
    threshold: f64,
    augment_threshold: f64,
    snippet_len: usize,
}

/// Cache key for a query: whitespace-collapsed, lowercased query plus limit and profile.
#[must_use]
pub fn normalize_query_key(raw: &str, options: &SearchOptions) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    format!("{collapsed}\u{1f}{}\u{1f}{}", options.limit, options.profile.as_str())
}

impl SearchEngine {
    /// Build from configuration.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stemmers: StemmerRegistry::from_names(&config.stemmers),
            synonyms: SynonymDictionary::with_extra(&config.synonyms),
            threshold: config.fuzzy_threshold,
            augment_threshold: config.link_augment_threshold,
            snippet_len: config.snippet_len,
        }
    }

    /// Register an additional stemmer.
    pub fn register_stemmer(&mut self, stemmer: Arc<dyn Stemmer>) {
        self.stemmers.register(stemmer);
    }

    fn fuzzy_candidates<'a>(
        &self,
        store: &'a NoteStore,
        parsed: &ParsedQuery,
        profile: RankingProfile,
    ) -> Vec<(&'a NoteDocument, Option<f64>)> {
        let variants: Vec<Vec<String>> = expand_query(&parsed.free_text(), &self.stemmers, &self.synonyms)
            .iter()
            .map(|variant| tokenize(variant))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        debug!("search variants: {variants:?}");

        let mut best: HashMap<&str, (&NoteDocument, f64)> = HashMap::new();
        for doc in store.documents() {
            for tokens in &variants {
                let score = score_document(doc, tokens, profile);
                best.entry(doc.path.as_str())
                    .and_modify(|entry| entry.1 = entry.1.min(score))
                    .or_insert((doc, score));
                if score <= 0.0 {
                    break;
                }
            }
        }
        best.into_values()
            .filter(|(_, score)| passes_threshold(Some(*score), self.threshold))
            .map(|(doc, score)| (doc, Some(score)))
            .collect()
    }

    /// Run the full pipeline.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidInput`] for an empty query.
    pub fn search(
        &self,
        store: &NoteStore,
        raw_query: &str,
        options: &SearchOptions,
    ) -> VaultResult<SearchResponse> {
        let parsed = parse_query(raw_query);
        if parsed.is_empty() {
            return Err(VaultError::invalid("query must not be empty"));
        }
        let limit = options.limit.max(1);
        let filter_only = parsed.is_filter_only();

        let mut candidates: Vec<(&NoteDocument, Option<f64>)> = if filter_only {
            store.documents().map(|doc| (doc, None)).collect()
        } else {
            self.fuzzy_candidates(store, &parsed, options.profile)
        };
        let total_candidates = candidates.len();

        candidates.sort_by(|(a, sa), (b, sb)| {
            let sa = sa.unwrap_or(0.0);
            let sb = sb.unwrap_or(0.0);
            sa.total_cmp(&sb)
                .then_with(|| b.modified_ms.cmp(&a.modified_ms))
                .then_with(|| a.path.cmp(&b.path))
        });
        if filter_only {
            candidates.retain(|(doc, _)| matches_predicate(doc, &parsed));
            candidates.truncate(limit);
        } else {
            candidates.truncate(limit);
            candidates.retain(|(doc, _)| matches_predicate(doc, &parsed));
        }

        let words = parsed.highlight_words();
        let pattern = highlight_pattern(&words);
        let mut hits: Vec<SearchHit> = candidates
            .iter()
            .map(|(doc, score)| self.hit(doc, score.unwrap_or(0.0), ResultType::Base, None, &words, pattern.as_ref()))
            .collect();

        let linked = self.augment(store, &hits, &words, pattern.as_ref());
        hits.extend(linked);
        hits.sort_by_key(|hit| hit.category.priority());

        Ok(SearchResponse {
            query: raw_query.to_string(),
            parsed,
            profile: options.profile,
            limit,
            total_candidates,
            results: hits,
        })
    }

    fn augment(
        &self,
        store: &NoteStore,
        base: &[SearchHit],
        words: &[String],
        pattern: Option<&regex::Regex>,
    ) -> Vec<SearchHit> {
        if !base.iter().any(|hit| hit.score < self.augment_threshold) {
            return Vec::new();
        }
        let graph = LinkGraph::new(store);
        let mut seen: HashSet<String> = base.iter().map(|hit| hit.path.clone()).collect();
        let mut linked = Vec::new();
        for source in base
            .iter()
            .filter(|hit| hit.score < self.augment_threshold)
            .take(AUGMENT_MAX_SOURCES)
        {
            let neighbor = graph
                .outgoing(&source.path)
                .into_iter()
                .map(|edge| edge.target)
                .find(|target| !seen.contains(target));
            let Some(target) = neighbor else {
                continue;
            };
            let Some(doc) = store.get(&target) else {
                continue;
            };
            seen.insert(target);
            linked.push(self.hit(
                doc,
                source.score * AUGMENT_SCORE_FACTOR,
                ResultType::Linked,
                Some(source.path.clone()),
                words,
                pattern,
            ));
        }
        linked
    }

    /// Shape a document into a highlighted result row.
    #[must_use]
    pub fn hit(
        &self,
        doc: &NoteDocument,
        score: f64,
        result_type: ResultType,
        linked_from: Option<String>,
        words: &[String],
        pattern: Option<&regex::Regex>,
    ) -> SearchHit {
        let category = classify(doc);
        let snippet = extract_snippet(&doc.body, words, self.snippet_len);
        SearchHit {
            path: doc.path.clone(),
            title: highlight(&doc.title, pattern),
            description: format!("[{}] {}", category.label(), highlight(&doc.description, pattern)),
            snippet: highlight(&snippet, pattern),
            score,
            category,
            result_type,
            linked_from,
            tags: doc.tags.clone(),
        }
    }
}
