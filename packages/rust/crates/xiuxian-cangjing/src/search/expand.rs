//! Query variants: lowercased original, stemmed form, synonym substitutions.

use std::collections::{BTreeMap, HashMap};

use super::stemmer::StemmerRegistry;

/// Upper bound on variants produced per query.
pub const MAX_QUERY_VARIANTS: usize = 6;

const BUILTIN_GROUPS: &[&[&str]] = &[
    &["doc", "docs", "documentation", "manual"],
    &["spec", "specification", "rfc"],
    &["guide", "tutorial", "howto", "walkthrough"],
    &["example", "sample", "snippet"],
    &["todo", "task", "checklist"],
    &["config", "configuration", "settings"],
    &["bug", "issue", "defect"],
    &["meeting", "sync", "standup"],
    &["idea", "thought", "concept"],
    &["ref", "reference", "cheatsheet"],
    &["документация", "документ", "описание"],
    &["задача", "задачи", "таск"],
    &["заметка", "заметки", "запись"],
    &["руководство", "инструкция", "гайд"],
];

/// Bidirectional synonym groups.
#[derive(Debug, Clone, Default)]
pub struct SynonymDictionary {
    groups: HashMap<String, Vec<String>>,
}

impl SynonymDictionary {
    /// Built-in groups only.
    #[must_use]
    pub fn builtin() -> Self {
        let mut dictionary = Self::default();
        for group in BUILTIN_GROUPS {
            dictionary.add_group(group.iter().map(|word| (*word).to_string()).collect());
        }
        dictionary
    }

    /// Built-in groups plus configured `word -> [synonyms]` entries.
    #[must_use]
    pub fn with_extra(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut dictionary = Self::builtin();
        for (word, synonyms) in extra {
            let mut group = vec![word.clone()];
            group.extend(synonyms.iter().cloned());
            dictionary.add_group(group);
        }
        dictionary
    }

    fn add_group(&mut self, group: Vec<String>) {
        let group: Vec<String> = group
            .into_iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        for word in &group {
            let entry = self.groups.entry(word.clone()).or_default();
            for other in &group {
                if other != word && !entry.contains(other) {
                    entry.push(other.clone());
                }
            }
        }
    }

    /// Synonyms of a lowercased word.
    #[must_use]
    pub fn synonyms_of(&self, word: &str) -> &[String] {
        self.groups.get(word).map_or(&[], Vec::as_slice)
    }
}

fn push(variant: String, variants: &mut Vec<String>) {
    if !variant.is_empty() && !variants.contains(&variant) && variants.len() < MAX_QUERY_VARIANTS {
        variants.push(variant);
    }
}

/// Expand lowercased free text into at most [`MAX_QUERY_VARIANTS`] variants,
/// the original always first.
#[must_use]
pub fn expand_query(
    text: &str,
    stemmers: &StemmerRegistry,
    synonyms: &SynonymDictionary,
) -> Vec<String> {
    let original = text.trim().to_lowercase();
    if original.is_empty() {
        return Vec::new();
    }
    let mut variants = vec![original.clone()];

    push(stemmers.stem_text(&original), &mut variants);

    let words: Vec<&str> = original.split_whitespace().collect();
    for (idx, word) in words.iter().enumerate() {
        for synonym in synonyms.synonyms_of(word) {
            let mut replaced: Vec<&str> = words.clone();
            replaced[idx] = synonym.as_str();
            push(replaced.join(" "), &mut variants);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_start_with_original_and_stay_bounded() {
        let variants = expand_query(
            "Docs Tasks",
            &StemmerRegistry::new(),
            &SynonymDictionary::builtin(),
        );
        assert_eq!(variants[0], "docs tasks");
        assert!(variants.contains(&"doc task".to_string()));
        assert!(variants.contains(&"documentation tasks".to_string()));
        assert!(variants.len() <= MAX_QUERY_VARIANTS);
    }

    #[test]
    fn configured_synonyms_are_bidirectional() {
        let mut extra = BTreeMap::new();
        extra.insert("k8s".to_string(), vec!["kubernetes".to_string()]);
        let dictionary = SynonymDictionary::with_extra(&extra);
        assert_eq!(dictionary.synonyms_of("kubernetes"), ["k8s".to_string()]);
    }
}
