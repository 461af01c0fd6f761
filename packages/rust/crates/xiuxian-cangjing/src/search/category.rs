//! Heuristic result categories and their display priority.

use serde::{Deserialize, Serialize};

use crate::note::NoteDocument;

/// Result category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Specs, RFCs, design documents.
    Specification,
    /// General documentation.
    Documentation,
    /// Guides and how-tos.
    Tutorial,
    /// Reference material and cheat sheets.
    Reference,
    /// Notes dominated by code.
    CodeSample,
    /// Checklists and todo notes.
    TaskList,
    /// Everything else.
    Other,
}

/// Output order of grouped results.
pub const CATEGORY_PRIORITY: [Category; 7] = [
    Category::Specification,
    Category::Documentation,
    Category::Tutorial,
    Category::Reference,
    Category::CodeSample,
    Category::TaskList,
    Category::Other,
];

const SPEC_KEYWORDS: &[&str] = &["spec", "rfc", "design", "adr", "спецификация", "требования"];
const TUTORIAL_KEYWORDS: &[&str] = &["tutorial", "guide", "how-to", "howto", "walkthrough", "руководство", "инструкция", "гайд"];
const REFERENCE_KEYWORDS: &[&str] = &["reference", "cheatsheet", "cheat-sheet", "glossary", "api", "справочник", "глоссарий"];
const DOC_KEYWORDS: &[&str] = &["doc", "docs", "documentation", "readme", "manual", "документация", "описание"];
const TASK_KEYWORDS: &[&str] = &["todo", "tasks", "checklist", "backlog", "задачи", "чеклист"];
const CODE_KEYWORDS: &[&str] = &["snippet", "example", "sample", "code", "пример"];

impl Category {
    /// Display label used in description prefixes.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Specification => "Specification",
            Self::Documentation => "Documentation",
            Self::Tutorial => "Tutorial",
            Self::Reference => "Reference",
            Self::CodeSample => "Code Sample",
            Self::TaskList => "Task List",
            Self::Other => "Other",
        }
    }

    /// Position in [`CATEGORY_PRIORITY`].
    #[must_use]
    pub fn priority(self) -> usize {
        CATEGORY_PRIORITY
            .iter()
            .position(|category| *category == self)
            .unwrap_or(CATEGORY_PRIORITY.len())
    }

    fn from_declared(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        let is = |keywords: &[&str]| keywords.iter().any(|k| lower == *k || lower.starts_with(k));
        if is(SPEC_KEYWORDS) {
            Some(Self::Specification)
        } else if is(TUTORIAL_KEYWORDS) {
            Some(Self::Tutorial)
        } else if is(TASK_KEYWORDS) {
            Some(Self::TaskList)
        } else if is(REFERENCE_KEYWORDS) {
            Some(Self::Reference)
        } else if is(CODE_KEYWORDS) {
            Some(Self::CodeSample)
        } else if is(DOC_KEYWORDS) {
            Some(Self::Documentation)
        } else {
            None
        }
    }
}

fn mentions(words: &[String], keywords: &[&str]) -> bool {
    words
        .iter()
        .any(|word| {
            let singular = word.strip_suffix('s').unwrap_or(word);
            keywords.iter().any(|keyword| word.as_str() == *keyword || singular == *keyword)
        })
}

/// Classify a note by declared type, then path/title words, then content shape.
#[must_use]
pub fn classify(doc: &NoteDocument) -> Category {
    if let Some(category) = doc.doc_type.as_deref().and_then(Category::from_declared) {
        return category;
    }
    let label_text = format!("{} {}", doc.path_lower.replace(['/', '_', '.'], " "), doc.title_lower);
    let words: Vec<String> = label_text
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    let checkboxes = doc
        .body
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with("- [ ]") || trimmed.starts_with("- [x]") || trimmed.starts_with("- [X]")
        })
        .count();
    let fences = doc
        .body
        .lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count()
        / 2;

    if mentions(&words, SPEC_KEYWORDS) {
        Category::Specification
    } else if mentions(&words, TUTORIAL_KEYWORDS) {
        Category::Tutorial
    } else if mentions(&words, TASK_KEYWORDS) || checkboxes >= 2 {
        Category::TaskList
    } else if mentions(&words, CODE_KEYWORDS) || fences >= 2 {
        Category::CodeSample
    } else if mentions(&words, REFERENCE_KEYWORDS) {
        Category::Reference
    } else if mentions(&words, DOC_KEYWORDS) {
        Category::Documentation
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::parse_note;

    #[test]
    fn classification_uses_type_path_and_shape() {
        let declared = parse_note("x.md", "---\ntype: rfc\n---\nbody", 0, 300);
        assert_eq!(classify(&declared), Category::Specification);
        let by_path = parse_note("guides/setup.md", "# Guide to setup\n", 0, 300);
        assert_eq!(classify(&by_path), Category::Tutorial);
        let tasks = parse_note("weekly.md", "- [ ] one\n- [x] two\n", 0, 300);
        assert_eq!(classify(&tasks), Category::TaskList);
        let plain = parse_note("thoughts.md", "musings", 0, 300);
        assert_eq!(classify(&plain), Category::Other);
    }

    #[test]
    fn priority_follows_declared_order() {
        assert!(Category::Specification.priority() < Category::Documentation.priority());
        assert_eq!(Category::Other.priority(), 6);
    }
}
