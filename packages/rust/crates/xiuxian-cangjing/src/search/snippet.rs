//! Snippet window selection and `**` highlighting.

use regex::{Regex, RegexBuilder};

const ELLIPSIS: &str = "...";

fn count_hits(window_lower: &str, words: &[String]) -> usize {
    words
        .iter()
        .map(|word| window_lower.matches(word.as_str()).count())
        .sum()
}

/// Choose the `window`-char slice of `body` with the most query-word hits,
/// scanning with a stride of half a window. Ties keep the earliest window.
#[must_use]
pub fn extract_snippet(body: &str, words: &[String], window: usize) -> String {
    let text = body.trim();
    let chars: Vec<char> = text.chars().collect();
    let window = window.max(1);
    if chars.len() <= window {
        return text.to_string();
    }
    let stride = (window / 2).max(1);
    let mut best_start = 0usize;
    let mut best_hits = 0usize;
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + window).min(chars.len());
        let slice: String = chars[start..end].iter().collect();
        let hits = count_hits(&slice.to_lowercase(), words);
        if hits > best_hits {
            best_hits = hits;
            best_start = start;
        }
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    let end = (best_start + window).min(chars.len());
    let mut snippet: String = chars[best_start..end].iter().collect();
    snippet = snippet.trim().to_string();
    if best_start > 0 {
        snippet.insert_str(0, ELLIPSIS);
    }
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Case-insensitive matcher for words of at least two characters, longest first.
#[must_use]
pub fn highlight_pattern(words: &[String]) -> Option<Regex> {
    let mut usable: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|word| word.chars().count() >= 2)
        .collect();
    if usable.is_empty() {
        return None;
    }
    usable.sort_by_key(|word| std::cmp::Reverse(word.len()));
    usable.dedup();
    let alternation = usable
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!("(?:{alternation})"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Wrap every match in `**`.
#[must_use]
pub fn highlight(text: &str, pattern: Option<&Regex>) -> String {
    match pattern {
        Some(regex) => regex.replace_all(text, "**$0**").into_owned(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_moves_to_densest_region() {
        let body = format!("{} graph graph graph {}", "filler ".repeat(40), "tail ".repeat(40));
        let snippet = extract_snippet(&body, &["graph".to_string()], 60);
        assert!(snippet.contains("graph"));
        assert!(snippet.starts_with(ELLIPSIS));
    }

    #[test]
    fn highlight_skips_single_chars_and_ignores_case() {
        let pattern = highlight_pattern(&["rust".to_string(), "a".to_string()]);
        assert_eq!(
            highlight("Rust is a language", pattern.as_ref()),
            "**Rust** is a language"
        );
    }
}
