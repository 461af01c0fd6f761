//! Narrow front matter grammar.
//!
//! Accepted: `key: scalar`, quoted strings, inline `[a, b]` lists, inline
//! `{k: v}` maps, block `- item` lists and one level of indented `k: v` maps.
//! Anything else is kept verbatim as a string.

use serde_json::{Map, Number, Value};

/// Split leading `---` front matter from the body.
///
/// Returns the raw block (without fences) and the remaining body. Content
/// without a closed block is returned whole as body.
#[must_use]
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let text = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(first_end) = text.find('\n') else {
        return (None, content);
    };
    if text[..first_end].trim_end() != "---" {
        return (None, content);
    }
    let block_start = first_end + 1;
    let mut offset = block_start;
    while offset <= text.len() {
        let line_end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
        let line = text[offset..line_end].trim_end();
        if line == "---" || line == "..." {
            let body_start = (line_end + 1).min(text.len());
            return (Some(&text[block_start..offset]), &text[body_start..]);
        }
        if line_end >= text.len() {
            break;
        }
        offset = line_end + 1;
    }
    (None, content)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse a front matter block into an ordered map.
#[must_use]
pub fn parse_frontmatter_block(block: &str) -> Map<String, Value> {
    let lines: Vec<&str> = block.lines().collect();
    let mut fields = Map::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        idx += 1;
        if is_skippable(line) || indent_of(line) > 0 {
            continue;
        }
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let key = unquote(key.trim()).to_string();
        if key.is_empty() {
            continue;
        }
        let rest = rest.trim();
        if !rest.is_empty() {
            fields.insert(key, parse_value(rest));
            continue;
        }

        let mut nested: Vec<&str> = Vec::new();
        while idx < lines.len() {
            let next = lines[idx];
            let is_child = indent_of(next) > 0 || next.trim_start().starts_with("- ");
            if !is_skippable(next) && !is_child {
                break;
            }
            if !is_skippable(next) {
                nested.push(next.trim());
            }
            idx += 1;
        }
        fields.insert(key, parse_nested(&nested));
    }
    fields
}

fn parse_nested(lines: &[&str]) -> Value {
    if lines.is_empty() {
        return Value::Null;
    }
    if lines.iter().all(|line| line.starts_with('-')) {
        return Value::Array(
            lines
                .iter()
                .map(|line| parse_value(line.trim_start_matches('-').trim()))
                .collect(),
        );
    }
    let mut map = Map::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            map.insert(unquote(key.trim()).to_string(), parse_value(value.trim()));
        }
    }
    Value::Object(map)
}

fn unquote(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if raw.len() >= 2
        && ((bytes[0] == b'"' && bytes[raw.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[raw.len() - 1] == b'\''))
    {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn is_bare_wikilink(raw: &str) -> bool {
    raw.starts_with("[[")
        && raw.ends_with("]]")
        && !raw[2..raw.len() - 2].contains(['[', ']'])
}

/// Split on `sep` outside brackets, braces and quotes.
fn split_top_level(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth -= 1,
            (None, c) if c == sep && depth == 0 => {
                parts.push(raw[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    let tail = raw[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts.retain(|part| !part.is_empty());
    parts
}

/// Parse one scalar or inline collection.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() || raw == "~" || raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if is_bare_wikilink(raw) {
        return Value::String(raw.to_string());
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(raw[1..raw.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\"));
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Value::String(raw[1..raw.len() - 1].replace("''", "'"));
    }
    if raw.starts_with('[') && raw.ends_with(']') {
        return Value::Array(
            split_top_level(&raw[1..raw.len() - 1], ',')
                .into_iter()
                .map(parse_value)
                .collect(),
        );
    }
    if raw.starts_with('{') && raw.ends_with('}') {
        let mut map = Map::new();
        for item in split_top_level(&raw[1..raw.len() - 1], ',') {
            let Some((key, value)) = item.split_once(':') else {
                return Value::String(raw.to_string());
            };
            map.insert(unquote(key.trim()).to_string(), parse_value(value));
        }
        return Value::Object(map);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>()
        && let Some(number) = Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text != text.trim()
        || text.starts_with(['[', '{', '"', '\'', '-', '!', '&', '*', '#', '|', '>'])
        || text.contains(": ")
        || text.contains(" #")
        || text.contains('\n')
        || !matches!(parse_value(text), Value::String(ref parsed) if parsed == text)
}

/// Render a value in the grammar accepted by [`parse_value`].
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => {
            if needs_quotes(text) {
                format!(
                    "\"{}\"",
                    text.replace('\\', "\\\\")
                        .replace('"', "\\\"")
                        .replace('\n', " ")
                )
            } else {
                text.clone()
            }
        }
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(render_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(key, value)| format!("{key}: {}", render_value(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Render a full `---` block followed by a newline.
#[must_use]
pub fn render_frontmatter(fields: &Map<String, Value>) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        let rendered = render_value(value);
        if rendered.is_empty() {
            out.push_str(&format!("{key}:\n"));
        } else {
            out.push_str(&format!("{key}: {rendered}\n"));
        }
    }
    out.push_str("---\n");
    out
}

/// Replace (or add) the front matter block of `content`.
#[must_use]
pub fn replace_frontmatter(content: &str, fields: &Map<String, Value>) -> String {
    let (_, body) = split_frontmatter(content);
    if fields.is_empty() {
        return body.to_string();
    }
    format!("{}{}", render_frontmatter(fields), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scalars_lists_and_maps() {
        let block = "title: Alpha Note\ncount: 3\nratio: 0.5\ndraft: false\nempty:\ntags: [x, \"y z\"]\nrelated:\n  - \"[[Beta]]\"\n  - [[Gamma]]\nmeta:\n  owner: kai\n  level: 2\nbroken: {oops\n";
        let fields = parse_frontmatter_block(block);
        assert_eq!(fields["title"], json!("Alpha Note"));
        assert_eq!(fields["count"], json!(3));
        assert_eq!(fields["ratio"], json!(0.5));
        assert_eq!(fields["draft"], json!(false));
        assert_eq!(fields["empty"], Value::Null);
        assert_eq!(fields["tags"], json!(["x", "y z"]));
        assert_eq!(fields["related"], json!(["[[Beta]]", "[[Gamma]]"]));
        assert_eq!(fields["meta"], json!({"owner": "kai", "level": 2}));
        assert_eq!(fields["broken"], json!("{oops"));
    }

    #[test]
    fn split_requires_closing_fence() {
        let (block, body) = split_frontmatter("---\ntitle: x\n---\nbody\n");
        assert_eq!(block, Some("title: x\n"));
        assert_eq!(body, "body\n");

        let unclosed = "---\ntitle: x\nbody\n";
        assert_eq!(split_frontmatter(unclosed), (None, unclosed));
    }

    #[test]
    fn render_then_parse_preserves_tricky_strings() {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Plan: phase 2"));
        fields.insert("id".into(), json!("007"));
        fields.insert("related".into(), json!(["[[Beta]]"]));
        let rendered = render_frontmatter(&fields);
        let (block, _) = split_frontmatter(&rendered);
        let parsed = parse_frontmatter_block(block.unwrap_or_default());
        assert_eq!(parsed, fields);
    }
}
