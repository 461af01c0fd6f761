//! Query grammar: `field:value`, `field:"quoted"`, `"phrase"`, `+required`,
//! `-excluded`, free terms.
//!
//! Fields are extracted first, then phrases, then the remainder is split into
//! tokens, each pass removing its spans so no token is classified twice.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::note::NoteDocument;
use crate::note::parser::compile_regex;

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r#"(?:^|\s)([A-Za-z_][\w.\-]*):(?:"([^"]*)"|([^\s"]+))"#)
});
static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r#""([^"]+)""#));

/// `field:value` constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Lowercased field name, dotted for nested front matter keys.
    pub field: String,
    /// Lowercased value.
    pub value: String,
}

/// Structured predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Free terms.
    pub terms: Vec<String>,
    /// Exact phrases.
    pub phrases: Vec<String>,
    /// `+term`.
    pub required: Vec<String>,
    /// `-term`.
    pub excluded: Vec<String>,
    /// Field filters.
    pub fields: Vec<FieldFilter>,
}

impl ParsedQuery {
    /// True when free terms are present.
    #[must_use]
    pub fn has_free_terms(&self) -> bool {
        !self.terms.is_empty()
    }

    /// True when any hard constraint is present.
    #[must_use]
    pub fn has_constraints(&self) -> bool {
        !(self.phrases.is_empty()
            && self.required.is_empty()
            && self.excluded.is_empty()
            && self.fields.is_empty())
    }

    /// Constraints only, no free terms.
    #[must_use]
    pub fn is_filter_only(&self) -> bool {
        !self.has_free_terms() && self.has_constraints()
    }

    /// Nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_free_terms() && !self.has_constraints()
    }

    /// Free terms joined by spaces.
    #[must_use]
    pub fn free_text(&self) -> String {
        self.terms.join(" ")
    }

    /// Words worth highlighting (at least two characters).
    #[must_use]
    pub fn highlight_words(&self) -> Vec<String> {
        let mut words: Vec<String> = self
            .terms
            .iter()
            .chain(&self.required)
            .cloned()
            .chain(
                self.phrases
                    .iter()
                    .flat_map(|phrase| phrase.split_whitespace().map(str::to_string)),
            )
            .filter(|word| word.chars().count() >= 2)
            .collect();
        words.sort();
        words.dedup();
        words
    }
}

/// Parse a raw query.
#[must_use]
pub fn parse_query(raw: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();

    for caps in FIELD_RE.captures_iter(raw) {
        let field = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str())
            .trim()
            .to_lowercase();
        if !field.is_empty() && !value.is_empty() {
            parsed.fields.push(FieldFilter { field, value });
        }
    }
    let without_fields = FIELD_RE.replace_all(raw, " ");

    for caps in PHRASE_RE.captures_iter(&without_fields) {
        if let Some(phrase) = caps.get(1) {
            let phrase = phrase.as_str().trim().to_lowercase();
            if !phrase.is_empty() {
                parsed.phrases.push(phrase);
            }
        }
    }
    let remainder = PHRASE_RE.replace_all(&without_fields, " ");

    for token in remainder.split_whitespace() {
        let token = token.trim_matches('"').to_lowercase();
        if let Some(rest) = token.strip_prefix('+')
            && !rest.is_empty()
        {
            parsed.required.push(rest.to_string());
        } else if let Some(rest) = token.strip_prefix('-')
            && !rest.is_empty()
        {
            parsed.excluded.push(rest.to_string());
        } else if !token.is_empty() && token != "+" && token != "-" {
            parsed.terms.push(token);
        }
    }
    parsed
}

fn json_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.to_lowercase()),
        Value::Number(number) => out.push(number.to_string()),
        Value::Bool(flag) => out.push(flag.to_string()),
        Value::Array(items) => items.iter().for_each(|item| json_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| json_strings(item, out)),
        Value::Null => {}
    }
}

fn frontmatter_values(doc: &NoteDocument, dotted: &str) -> Vec<String> {
    let mut current: Option<&Value> = None;
    for (idx, segment) in dotted.split('.').enumerate() {
        let map = if idx == 0 {
            Some(&doc.frontmatter)
        } else {
            current.and_then(Value::as_object)
        };
        current = map.and_then(|map| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                .map(|(_, value)| value)
        });
    }
    let mut out = Vec::new();
    if let Some(value) = current {
        json_strings(value, &mut out);
    }
    out
}

fn field_matches(doc: &NoteDocument, filter: &FieldFilter) -> bool {
    let value = filter.value.as_str();
    match filter.field.as_str() {
        "tag" | "tags" => {
            let wanted = value.trim_start_matches('#');
            doc.tags.iter().any(|tag| {
                let tag = tag.to_lowercase();
                tag == wanted || tag.starts_with(&format!("{wanted}/"))
            })
        }
        "type" => doc
            .doc_type
            .as_deref()
            .is_some_and(|doc_type| doc_type.eq_ignore_ascii_case(value)),
        "title" => doc.title_lower.contains(value),
        "path" | "in" | "folder" => doc.path_lower.contains(value),
        "alias" | "aliases" => doc
            .aliases
            .iter()
            .any(|alias| alias.to_lowercase().contains(value)),
        "id" => doc
            .short_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(value)),
        "description" => doc.description.to_lowercase().contains(value),
        dotted => frontmatter_values(doc, dotted)
            .iter()
            .any(|candidate| candidate.contains(value)),
    }
}

/// Hard post-filter: phrase, required, excluded and field checks.
#[must_use]
pub fn matches_predicate(doc: &NoteDocument, query: &ParsedQuery) -> bool {
    if !query.has_constraints() {
        return true;
    }
    let haystack = doc.searchable_text();
    query.phrases.iter().all(|phrase| haystack.contains(phrase.as_str()))
        && query.required.iter().all(|term| haystack.contains(term.as_str()))
        && !query.excluded.iter().any(|term| haystack.contains(term.as_str()))
        && query.fields.iter().all(|filter| field_matches(doc, filter))
}
