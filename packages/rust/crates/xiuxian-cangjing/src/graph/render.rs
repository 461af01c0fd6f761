use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::subgraph::GraphSnapshot;

/// Snapshot output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Structured nodes and edges.
    #[default]
    Json,
    /// Mermaid flowchart source.
    Mermaid,
    /// Plain-text summary of the most connected notes.
    Text,
}

fn mermaid_label(text: &str) -> String {
    text.replace('"', "'").replace(['[', ']'], "")
}

/// Render as a left-to-right Mermaid flowchart.
#[must_use]
pub fn render_mermaid(snapshot: &GraphSnapshot) -> String {
    let mut out = String::from("graph LR\n");
    let ids: HashMap<&str, String> = snapshot
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.path.as_str(), format!("n{idx}")))
        .collect();
    for node in &snapshot.nodes {
        if let Some(id) = ids.get(node.path.as_str()) {
            let _ = writeln!(out, "  {id}[\"{}\"]", mermaid_label(&node.title));
        }
    }
    for edge in &snapshot.edges {
        let (Some(source), Some(target)) =
            (ids.get(edge.source.as_str()), ids.get(edge.target.as_str()))
        else {
            continue;
        };
        let _ = writeln!(out, "  {source} -->|{}| {target}", edge.relations.join(","));
    }
    out
}

/// Text summary: counts plus the `top` highest-degree notes.
#[must_use]
pub fn render_text(snapshot: &GraphSnapshot, top: usize) -> String {
    let mut out = format!(
        "{} notes, {} links{}\n",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        if snapshot.truncated { " (truncated)" } else { "" }
    );
    let mut ranked: Vec<_> = snapshot.nodes.iter().collect();
    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.path.cmp(&b.path)));
    if !ranked.is_empty() {
        out.push_str("Most connected:\n");
    }
    for (idx, node) in ranked.into_iter().take(top).enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({}) - {} links",
            idx + 1,
            node.title,
            node.path,
            node.degree
        );
    }
    out
}
