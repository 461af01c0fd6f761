//! Weighted fuzzy scoring. Scores run from 0 (perfect) to 1 (no match).

use serde::{Deserialize, Serialize};

use crate::note::NoteDocument;
use crate::note::parser::tokenize;

/// Field weighting preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingProfile {
    /// Title and body weighted evenly.
    #[default]
    Balanced,
    /// Title, tags and type upweighted.
    Taxonomy,
    /// Body upweighted, wider fuzzy distance.
    Semantic,
}

/// Per-field weights in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    /// Title.
    pub title: f64,
    /// Body.
    pub body: f64,
    /// Description.
    pub description: f64,
    /// Path.
    pub path: f64,
    /// Tags.
    pub tags: f64,
    /// Aliases.
    pub aliases: f64,
    /// Front matter type.
    pub doc_type: f64,
}

impl RankingProfile {
    /// Parse a profile name; unknown names yield `Balanced`.
    #[must_use]
    pub fn from_alias(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "taxonomy" | "tags" => Self::Taxonomy,
            "semantic" | "content" => Self::Semantic,
            _ => Self::Balanced,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Taxonomy => "taxonomy",
            Self::Semantic => "semantic",
        }
    }

    /// Field weights for this profile.
    #[must_use]
    pub fn weights(self) -> FieldWeights {
        match self {
            Self::Balanced => FieldWeights {
                title: 1.0,
                body: 1.0,
                description: 0.9,
                path: 0.8,
                tags: 0.85,
                aliases: 0.9,
                doc_type: 0.7,
            },
            Self::Taxonomy => FieldWeights {
                title: 1.0,
                body: 0.7,
                description: 0.8,
                path: 0.8,
                tags: 1.0,
                aliases: 0.95,
                doc_type: 1.0,
            },
            Self::Semantic => FieldWeights {
                title: 0.85,
                body: 1.0,
                description: 1.0,
                path: 0.7,
                tags: 0.75,
                aliases: 0.8,
                doc_type: 0.7,
            },
        }
    }

    /// Allowed edit distance as a fraction of token length.
    #[must_use]
    pub fn error_ratio(self) -> f64 {
        match self {
            Self::Balanced | Self::Taxonomy => 0.25,
            Self::Semantic => 0.4,
        }
    }
}

/// Edit distance, or `None` once it provably exceeds `max`.
#[must_use]
pub fn levenshtein_bounded(a: &[char], b: &[char], max: usize) -> Option<usize> {
    let (m, n) = (a.len(), b.len());
    if m.abs_diff(n) > max {
        return None;
    }
    if m == 0 || n == 0 {
        return Some(m.max(n));
    }
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];
    for i in 1..=m {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (prev[n] <= max).then_some(prev[n])
}

#[allow(clippy::cast_precision_loss)]
fn token_score(token: &str, haystack: &str, words: &[String], error_ratio: f64) -> f64 {
    if haystack.contains(token) {
        return 0.0;
    }
    let chars: Vec<char> = token.chars().collect();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let allowed = (chars.len() as f64 * error_ratio).floor() as usize;
    if allowed == 0 {
        return 1.0;
    }
    let mut best: Option<usize> = None;
    for word in words {
        let word: Vec<char> = word.chars().collect();
        let bound = best.map_or(allowed, |b| b.saturating_sub(1));
        if let Some(distance) = levenshtein_bounded(&chars, &word, bound) {
            best = Some(distance);
            if distance <= 1 {
                break;
            }
        }
    }
    best.map_or(1.0, |distance| distance as f64 / chars.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn field_score(tokens: &[String], haystack: &str, words: &[String], error_ratio: f64) -> f64 {
    if haystack.is_empty() {
        return 1.0;
    }
    let total: f64 = tokens
        .iter()
        .map(|token| token_score(token, haystack, words, error_ratio))
        .sum();
    total / tokens.len() as f64
}

fn weighted(score: f64, weight: f64) -> f64 {
    1.0 - (1.0 - score) * weight
}

/// Best (lowest) weighted field score of `doc` for pre-tokenized query text.
#[must_use]
pub fn score_document(doc: &NoteDocument, tokens: &[String], profile: RankingProfile) -> f64 {
    if tokens.is_empty() {
        return 1.0;
    }
    let weights = profile.weights();
    let ratio = profile.error_ratio();

    let short_fields: [(String, f64); 6] = [
        (doc.title_lower.clone(), weights.title),
        (doc.description.to_lowercase(), weights.description),
        (doc.path_lower.clone(), weights.path),
        (doc.tags.join(" ").to_lowercase(), weights.tags),
        (doc.aliases.join(" ").to_lowercase(), weights.aliases),
        (
            doc.doc_type.as_deref().unwrap_or_default().to_lowercase(),
            weights.doc_type,
        ),
    ];
    let mut best = weighted(field_score(tokens, &doc.body_lower, &doc.vocabulary, ratio), weights.body);
    for (text, weight) in &short_fields {
        if best <= 0.0 {
            break;
        }
        let words = tokenize(text);
        best = best.min(weighted(field_score(tokens, text, &words, ratio), *weight));
    }
    best
}

/// Acceptance test: strictly below the threshold, missing scores count as 0.
#[must_use]
pub fn passes_threshold(score: Option<f64>, threshold: f64) -> bool {
    score.unwrap_or(0.0) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::parse_note;

    #[test]
    fn bounded_distance_stops_early() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein_bounded(&a, &b, 3), Some(3));
        assert_eq!(levenshtein_bounded(&a, &b, 2), None);
    }

    #[test]
    fn threshold_is_strict_and_missing_is_perfect() {
        assert!(passes_threshold(None, 0.35));
        assert!(passes_threshold(Some(0.34), 0.35));
        assert!(!passes_threshold(Some(0.35), 0.35));
        assert!(!passes_threshold(Some(0.40), 0.35));
    }

    #[test]
    fn typo_scores_between_exact_and_miss() {
        let doc = parse_note("n.md", "# Knowledge Graph\nlinks everywhere", 0, 300);
        let exact = score_document(&doc, &["knowledge".into()], RankingProfile::Balanced);
        let typo = score_document(&doc, &["knowlege".into()], RankingProfile::Balanced);
        let miss = score_document(&doc, &["zebra".into()], RankingProfile::Balanced);
        assert!(exact.abs() < f64::EPSILON);
        assert!(typo > 0.0 && typo < 0.35);
        assert!((miss - 1.0).abs() < f64::EPSILON || miss >= 0.35);
    }
}
