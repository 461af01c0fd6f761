use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::LinkGraph;
use super::edges::{DanglingRef, dangling_refs};

/// Every link touching one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    /// Resolved note, absent when the reference did not resolve.
    pub path: Option<String>,
    /// Outgoing targets grouped by relation.
    pub outgoing: BTreeMap<String, Vec<String>>,
    /// Notes linking here, grouped by relation.
    pub incoming: BTreeMap<String, Vec<String>>,
    /// References that resolve to nothing.
    pub dangling: Vec<DanglingRef>,
    /// Near matches when unresolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Outgoing edges by relation, backlinks and dangling references of `note`.
#[must_use]
pub fn relations_of(graph: &LinkGraph<'_>, note: &str) -> Relations {
    let store = graph.store();
    let resolution = store.resolve(note);
    let Some(path) = resolution.path else {
        return Relations {
            suggestions: resolution.suggestions,
            ..Relations::default()
        };
    };
    let mut relations = Relations::default();
    for edge in graph.outgoing(&path) {
        let targets = relations.outgoing.entry(edge.relation).or_default();
        if !targets.contains(&edge.target) {
            targets.push(edge.target);
        }
    }
    for edge in graph.incoming(&path) {
        let sources = relations.incoming.entry(edge.relation).or_default();
        if !sources.contains(&edge.source) {
            sources.push(edge.source);
        }
    }
    if let Some(doc) = store.get(&path) {
        relations.dangling = dangling_refs(doc, store.lookup());
    }
    relations.path = Some(path);
    relations
}
