//! Markdown note parsing.

mod frontmatter;
mod links;
mod paths;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

pub use frontmatter::{
    parse_frontmatter_block, parse_value, render_frontmatter, render_value, replace_frontmatter,
    split_frontmatter,
};
pub(crate) use links::WIKILINK_RE;
pub use links::{
    extract_field_refs, extract_xrefs, normalize_wikilink_target, rewrite_markdown_links,
    rewrite_wikilinks, strip_wikilinks,
};
pub use paths::{
    NOTE_EXTENSION, clean_relative, ensure_note_extension, fold_for_match, folder_of,
    is_supported_note, normalize_key, relative_link, stem_of, trim_note_extension,
};
pub(crate) use paths::normalize_slashes;

use super::models::NoteDocument;

const DESCRIPTION_LEAD_CHARS: usize = 180;
const MAX_VOCABULARY: usize = 5000;

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?:^|[\s(])#([\p{L}\p{N}_][\p{L}\p{N}_/\-]*)"));
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?ms)^(```|~~~).*?^(```|~~~)[ \t]*$"));

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let value = fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)?;
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(value) = fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
    else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn lead_text(body: &str, limit: usize) -> String {
    let mut out = String::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("```") {
            if out.is_empty() {
                continue;
            }
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
        if out.chars().count() >= limit {
            break;
        }
    }
    truncate_chars(&out, limit)
}

/// Prefix of at most `limit` characters.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Split into lowercase word tokens (letters, digits, underscore).
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn inline_hashtags(body: &str) -> Vec<String> {
    let without_code = FENCE_RE.replace_all(body, "");
    HASHTAG_RE
        .captures_iter(&without_code)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim_end_matches(['/', '-'])))
        .filter(|tag| tag.chars().any(char::is_alphabetic))
        .map(str::to_string)
        .collect()
}

fn merge_tags(declared: Vec<String>, inline: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tag in declared.into_iter().chain(inline) {
        let tag = tag.trim_start_matches('#').trim().to_string();
        if !tag.is_empty() && seen.insert(tag.to_lowercase()) {
            out.push(tag);
        }
    }
    out
}

fn vocabulary(body_lower: &str) -> Vec<String> {
    let mut words: BTreeSet<String> = BTreeSet::new();
    for token in tokenize(body_lower) {
        if token.chars().count() >= 2 {
            words.insert(token);
            if words.len() >= MAX_VOCABULARY {
                break;
            }
        }
    }
    words.into_iter().collect()
}

/// Parse raw note content into a [`NoteDocument`].
#[must_use]
pub fn parse_note(rel_path: &str, content: &str, modified_ms: i64, preview_len: usize) -> NoteDocument {
    let (block, body) = split_frontmatter(content);
    let frontmatter = block.map(parse_frontmatter_block).unwrap_or_default();
    let stem = stem_of(rel_path);

    let title = string_field(&frontmatter, "title")
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| stem.clone());
    let description = string_field(&frontmatter, "description")
        .unwrap_or_else(|| lead_text(body, DESCRIPTION_LEAD_CHARS));
    let mut aliases = list_field(&frontmatter, "aliases");
    aliases.extend(list_field(&frontmatter, "alias"));
    let tags = merge_tags(list_field(&frontmatter, "tags"), inline_hashtags(body));
    let body_lower = body.to_lowercase();

    NoteDocument {
        path: rel_path.to_string(),
        path_lower: rel_path.to_lowercase(),
        stem,
        title_lower: title.to_lowercase(),
        title,
        description,
        preview: truncate_chars(body.trim_start(), preview_len),
        tags,
        aliases,
        doc_type: string_field(&frontmatter, "type"),
        short_id: string_field(&frontmatter, "id"),
        modified_ms,
        xrefs: extract_xrefs(body, rel_path),
        field_refs: extract_field_refs(&frontmatter),
        vocabulary: vocabulary(&body_lower),
        content_hash: xxhash_rust::xxh3::xxh3_64(content.as_bytes()),
        body: body.to_string(),
        body_lower,
        frontmatter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_heading_then_stem() {
        let with_heading = parse_note("a/Alpha.md", "# Real Title\nbody", 0, 300);
        assert_eq!(with_heading.title, "Real Title");
        let bare = parse_note("a/Alpha.md", "just text", 0, 300);
        assert_eq!(bare.title, "Alpha");
        let declared = parse_note("a/Alpha.md", "---\ntitle: Declared\n---\n# Heading\n", 0, 300);
        assert_eq!(declared.title, "Declared");
    }

    #[test]
    fn tags_merge_declared_and_inline() {
        let doc = parse_note(
            "n.md",
            "---\ntags: [rust, Graph]\n---\nText #graph and #todo/later\n\n```\n#notatag\n```\n",
            0,
            300,
        );
        assert_eq!(doc.tags, vec!["rust", "Graph", "todo/later"]);
    }

    #[test]
    fn field_refs_and_xrefs_are_separate() {
        let doc = parse_note(
            "n.md",
            "---\nrelated: [\"[[Beta]]\"]\n---\nSee [[Gamma]].\n",
            0,
            300,
        );
        assert_eq!(doc.xrefs, vec!["Gamma".to_string()]);
        assert_eq!(doc.field_refs.len(), 1);
        assert_eq!(doc.field_refs[0].field, "related");
        assert_eq!(doc.field_refs[0].target, "Beta");
    }
}
