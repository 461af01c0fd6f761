use std::sync::LazyLock;

use comrak::{Arena, Options, nodes::NodeValue, parse_document};
use regex::Regex;
use serde_json::{Map, Value};

use super::compile_regex;
use super::paths::{
    folder_of, is_supported_note, normalize_slashes, relative_link, trim_note_extension,
};
use crate::note::models::FieldRef;

/// `[[target#heading|label]]`, optionally embedded with `!`.
pub(crate) static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(!?)\[\[([^\[\]\|#\^\n]*)([#\^][^\[\]\|\n]*)?(\|[^\[\]\n]*)?\]\]")
});

/// Inline `[label](destination "title")` links, optionally images.
static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(!?)\[([^\]\n]*)\]\((<[^>\n]*>|[^)\s]+)([^)\n]*)\)")
});

/// Strip anchors and labels from a wikilink body.
#[must_use]
pub fn normalize_wikilink_target(raw: &str) -> Option<String> {
    let mut candidate = raw.trim();
    for sep in ['|', '#', '^'] {
        if let Some((left, _)) = candidate.split_once(sep) {
            candidate = left;
        }
    }
    let normalized = normalize_slashes(candidate.trim());
    let normalized = normalized.trim_matches('/');
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

fn normalize_markdown_target(raw: &str, source_path: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unwrapped = if trimmed.starts_with('<') {
        let end = trimmed.find('>')?;
        &trimmed[1..end]
    } else {
        trimmed.split_whitespace().next().unwrap_or_default()
    };
    let mut candidate = normalize_slashes(unwrapped);
    let lower = candidate.to_lowercase();
    if candidate.is_empty()
        || lower.starts_with('#')
        || lower.contains("://")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
        || lower.starts_with("javascript:")
    {
        return None;
    }
    for sep in ['#', '?'] {
        if let Some((left, _)) = candidate.split_once(sep) {
            candidate = left.to_string();
        }
    }

    let absolute = candidate.starts_with('/');
    let mut parts: Vec<String> = if absolute {
        Vec::new()
    } else {
        folder_of(source_path)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    };
    for segment in candidate.split('/') {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            cleaned => parts.push(cleaned.to_string()),
        }
    }
    let joined = parts.join("/");
    let normalized = trim_note_extension(&joined).trim_matches('/');
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Wikilink and markdown-link targets found in a note body, sorted and deduplicated.
///
/// Markdown links are resolved relative to the source note's folder; links
/// inside code blocks are ignored.
#[must_use]
pub fn extract_xrefs(body: &str, source_path: &str) -> Vec<String> {
    let mut options = Options::default();
    options.extension.wikilinks_title_after_pipe = true;

    let arena = Arena::new();
    let root_node = parse_document(&arena, body, &options);

    let mut out: Vec<String> = Vec::new();
    for node in root_node.descendants() {
        let normalized = match &node.data().value {
            NodeValue::Link(link) => normalize_markdown_target(&link.url, source_path),
            NodeValue::WikiLink(link) => normalize_wikilink_target(&link.url),
            _ => None,
        };
        if let Some(normalized) = normalized {
            out.push(normalized);
        }
    }
    out.sort();
    out.dedup();
    out
}

fn collect_wikilinks(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for caps in WIKILINK_RE.captures_iter(text) {
                if let Some(target) = caps.get(2).and_then(|m| normalize_wikilink_target(m.as_str()))
                {
                    out.push(target);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_wikilinks(item, out);
            }
        }
        _ => {}
    }
}

/// Wikilinks held in front matter fields, one entry per (field, target).
#[must_use]
pub fn extract_field_refs(frontmatter: &Map<String, Value>) -> Vec<FieldRef> {
    let mut refs = Vec::new();
    for (key, value) in frontmatter {
        let mut targets = Vec::new();
        collect_wikilinks(value, &mut targets);
        let field = key.trim().to_lowercase();
        for target in targets {
            refs.push(FieldRef {
                field: field.clone(),
                target,
            });
        }
    }
    refs.sort();
    refs.dedup();
    refs
}

/// Rewrite wikilink targets in `content`. The callback receives the cleaned
/// target and returns a replacement; anchors, labels and embed markers are kept.
pub fn rewrite_wikilinks<F>(content: &str, mut replace: F) -> (String, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut count = 0usize;
    let rewritten = WIKILINK_RE.replace_all(content, |caps: &regex::Captures<'_>| {
        let original = caps.get(0).map_or("", |m| m.as_str()).to_string();
        let Some(target) = caps.get(2).and_then(|m| normalize_wikilink_target(m.as_str())) else {
            return original;
        };
        let Some(replacement) = replace(&target) else {
            return original;
        };
        count += 1;
        format!(
            "{}[[{}{}{}]]",
            caps.get(1).map_or("", |m| m.as_str()),
            replacement,
            caps.get(3).map_or("", |m| m.as_str()),
            caps.get(4).map_or("", |m| m.as_str()),
        )
    });
    (rewritten.into_owned(), count)
}

/// Rewrite relative markdown links in `content`.
///
/// Destinations are resolved against `source_path` and handed to the callback
/// as vault paths without extension; a returned note path is re-emitted
/// relative to `link_from`, keeping the original extension style, anchor and
/// title. Fenced code is left alone.
pub fn rewrite_markdown_links<F>(
    content: &str,
    source_path: &str,
    link_from: &str,
    mut replace: F,
) -> (String, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut count = 0usize;
    let mut in_fence = false;
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let fence = line.trim_start();
        if fence.starts_with("```") || fence.starts_with("~~~") {
            in_fence = !in_fence;
            out.push_str(line);
            continue;
        }
        if in_fence {
            out.push_str(line);
            continue;
        }
        let rewritten = MARKDOWN_LINK_RE.replace_all(line, |caps: &regex::Captures<'_>| {
            let original = caps.get(0).map_or("", |m| m.as_str()).to_string();
            let destination = caps.get(3).map_or("", |m| m.as_str());
            let Some(target) = normalize_markdown_target(destination, source_path) else {
                return original;
            };
            let Some(new_path) = replace(&target) else {
                return original;
            };
            let updated = format!(
                "{}[{}]({}{})",
                caps.get(1).map_or("", |m| m.as_str()),
                caps.get(2).map_or("", |m| m.as_str()),
                relink_destination(destination, link_from, &new_path),
                caps.get(4).map_or("", |m| m.as_str()),
            );
            if updated != original {
                count += 1;
            }
            updated
        });
        out.push_str(&rewritten);
    }
    (out, count)
}

fn relink_destination(destination: &str, link_from: &str, new_path: &str) -> String {
    let wrapped = destination.starts_with('<') && destination.ends_with('>');
    let inner = if wrapped {
        &destination[1..destination.len() - 1]
    } else {
        destination
    };
    let split = inner.find(['#', '?']).unwrap_or(inner.len());
    let (path_part, suffix) = inner.split_at(split);
    let target = if is_supported_note(std::path::Path::new(path_part)) {
        new_path
    } else {
        trim_note_extension(new_path)
    };
    let url = if path_part.starts_with('/') {
        format!("/{target}{suffix}")
    } else {
        format!("{}{suffix}", relative_link(folder_of(link_from), target))
    };
    if wrapped || url.contains(' ') {
        format!("<{url}>")
    } else {
        url
    }
}

/// Replace wikilinks matching the predicate with their display text.
pub fn strip_wikilinks<F>(content: &str, mut matches: F) -> (String, usize)
where
    F: FnMut(&str) -> bool,
{
    let mut count = 0usize;
    let rewritten = WIKILINK_RE.replace_all(content, |caps: &regex::Captures<'_>| {
        let original = caps.get(0).map_or("", |m| m.as_str()).to_string();
        let Some(target) = caps.get(2).and_then(|m| normalize_wikilink_target(m.as_str())) else {
            return original;
        };
        if !matches(&target) {
            return original;
        }
        count += 1;
        caps.get(4)
            .map(|label| label.as_str().trim_start_matches('|').to_string())
            .unwrap_or(target)
    });
    (rewritten.into_owned(), count)
}
