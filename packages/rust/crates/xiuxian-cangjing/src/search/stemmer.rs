//! Morphological normalization behind a pluggable [`Stemmer`] capability.

use std::sync::Arc;

use log::warn;

/// Writing system of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    /// Latin letters.
    Latin,
    /// Cyrillic letters (U+0400..U+04FF).
    Cyrillic,
    /// Digits, symbols, other alphabets.
    Other,
}

fn is_cyrillic(ch: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&ch)
}

/// Detect the dominant script of a word.
#[must_use]
pub fn detect_script(word: &str) -> Script {
    if word.chars().any(is_cyrillic) {
        Script::Cyrillic
    } else if word.chars().any(|ch| ch.is_ascii_alphabetic() || (ch.is_alphabetic() && ch <= '\u{024F}')) {
        Script::Latin
    } else {
        Script::Other
    }
}

/// Stemming capability for one script.
pub trait Stemmer: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;
    /// Whether this stemmer handles `script`.
    fn supports(&self, script: Script) -> bool;
    /// Stem a lowercased word.
    fn stem(&self, word: &str) -> String;
}

const LATIN_SUFFIXES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("ization", "ize"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("iveness", "ive"),
    ("ations", "ate"),
    ("ation", "ate"),
    ("ments", ""),
    ("ment", ""),
    ("ness", ""),
    ("ings", ""),
    ("ing", ""),
    ("ies", "y"),
    ("ied", "y"),
    ("edly", ""),
    ("ers", ""),
    ("ed", ""),
    ("er", ""),
    ("ly", ""),
    ("sses", "ss"),
    ("ss", "ss"),
    ("s", ""),
];

const CYRILLIC_SUFFIXES: &[&str] = &[
    "иями", "ями", "ами", "ого", "его", "ому", "ему", "ыми", "ими", "ией", "ость", "ости", "ая",
    "яя", "ое", "ее", "ые", "ие", "ый", "ий", "ой", "ам", "ям", "ах", "ях", "ом", "ем", "ов", "ев",
    "ей", "ию", "ия", "ью", "ы", "и", "а", "я", "о", "е", "у", "ю", "ь",
];

const MIN_STEM_CHARS: usize = 3;

/// Fixed suffix-stripping table for Latin and Cyrillic words.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuffixTableStemmer;

fn strip_suffix(word: &str, suffix: &str) -> Option<String> {
    let base = word.strip_suffix(suffix)?;
    (base.chars().count() >= MIN_STEM_CHARS).then(|| base.to_string())
}

impl Stemmer for SuffixTableStemmer {
    fn name(&self) -> &'static str {
        "suffix-table"
    }

    fn supports(&self, script: Script) -> bool {
        matches!(script, Script::Latin | Script::Cyrillic)
    }

    fn stem(&self, word: &str) -> String {
        match detect_script(word) {
            Script::Latin => LATIN_SUFFIXES
                .iter()
                .find_map(|(suffix, replacement)| {
                    strip_suffix(word, suffix).map(|base| format!("{base}{replacement}"))
                })
                .unwrap_or_else(|| word.to_string()),
            Script::Cyrillic => CYRILLIC_SUFFIXES
                .iter()
                .find_map(|suffix| strip_suffix(word, suffix))
                .unwrap_or_else(|| word.to_string()),
            Script::Other => word.to_string(),
        }
    }
}

/// Registered stemmers, consulted in order, with the suffix table as fallback.
#[derive(Clone)]
pub struct StemmerRegistry {
    stemmers: Vec<Arc<dyn Stemmer>>,
    fallback: SuffixTableStemmer,
}

impl std::fmt::Debug for StemmerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemmerRegistry")
            .field(
                "stemmers",
                &self.stemmers.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Default for StemmerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StemmerRegistry {
    /// Registry with only the fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stemmers: Vec::new(),
            fallback: SuffixTableStemmer,
        }
    }

    /// Registry enabling the configured built-in names. Unknown names are logged.
    #[must_use]
    pub fn from_names(names: &[String]) -> Self {
        let mut registry = Self::new();
        for name in names {
            match name.trim().to_lowercase().as_str() {
                "suffix-table" | "suffix" => registry.register(Arc::new(SuffixTableStemmer)),
                other => warn!("stemmer '{other}' is not available; using suffix table"),
            }
        }
        registry
    }

    /// Add an implementation; later registrations are consulted after earlier ones.
    pub fn register(&mut self, stemmer: Arc<dyn Stemmer>) {
        self.stemmers.push(stemmer);
    }

    /// Stem one lowercased word with the first stemmer supporting its script.
    #[must_use]
    pub fn stem(&self, word: &str) -> String {
        let script = detect_script(word);
        self.stemmers
            .iter()
            .find(|stemmer| stemmer.supports(script))
            .map_or_else(|| self.fallback.stem(word), |stemmer| stemmer.stem(word))
    }

    /// Stem every whitespace-separated word.
    #[must_use]
    pub fn stem_text(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| self.stem(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_table_handles_both_scripts() {
        let stemmer = SuffixTableStemmer;
        assert_eq!(stemmer.stem("notes"), "note");
        assert_eq!(stemmer.stem("indexing"), "index");
        assert_eq!(stemmer.stem("libraries"), "library");
        assert_eq!(stemmer.stem("заметки"), "заметк");
        assert_eq!(stemmer.stem("is"), "is");
    }

    #[test]
    fn registry_prefers_registered_stemmer() {
        struct Upper;
        impl Stemmer for Upper {
            fn name(&self) -> &'static str {
                "upper"
            }
            fn supports(&self, script: Script) -> bool {
                script == Script::Latin
            }
            fn stem(&self, word: &str) -> String {
                word.to_uppercase()
            }
        }
        let mut registry = StemmerRegistry::new();
        registry.register(Arc::new(Upper));
        assert_eq!(registry.stem("notes"), "NOTES");
        assert_eq!(registry.stem("заметки"), "заметк");
    }
}
