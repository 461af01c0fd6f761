use serde::{Deserialize, Serialize};

use crate::note::models::NoteDocument;
use crate::note::resolve::LookupTables;

/// Relation name for body links.
pub const XREF_RELATION: &str = "xref";

/// Relation name for a front matter link field.
#[must_use]
pub fn field_relation(field: &str) -> String {
    format!("field:{field}")
}

/// Directed, typed link between two indexed notes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Linking note.
    pub source: String,
    /// Linked note.
    pub target: String,
    /// `xref` or `field:<name>`.
    pub relation: String,
}

/// Raw reference that did not resolve to any note.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DanglingRef {
    /// Linking note.
    pub source: String,
    /// Raw target text.
    pub target: String,
    /// Relation it would have carried.
    pub relation: String,
}

fn raw_refs(doc: &NoteDocument) -> impl Iterator<Item = (&str, String)> {
    doc.xrefs
        .iter()
        .map(|target| (target.as_str(), XREF_RELATION.to_string()))
        .chain(
            doc.field_refs
                .iter()
                .map(|r| (r.target.as_str(), field_relation(&r.field))),
        )
}

/// Resolve every raw reference of `doc`; self-links are dropped.
#[must_use]
pub fn derive_edges(doc: &NoteDocument, lookup: &LookupTables) -> Vec<Edge> {
    let mut edges: Vec<Edge> = raw_refs(doc)
        .filter_map(|(raw, relation)| {
            let (target, _) = lookup.resolve_exact(raw)?;
            (target != doc.path).then(|| Edge {
                source: doc.path.clone(),
                target,
                relation,
            })
        })
        .collect();
    edges.sort();
    edges.dedup();
    edges
}

/// References of `doc` that resolve nowhere.
#[must_use]
pub fn dangling_refs(doc: &NoteDocument, lookup: &LookupTables) -> Vec<DanglingRef> {
    let mut out: Vec<DanglingRef> = raw_refs(doc)
        .filter(|(raw, _)| lookup.resolve_exact(raw).is_none())
        .map(|(raw, relation)| DanglingRef {
            source: doc.path.clone(),
            target: raw.to_string(),
            relation,
        })
        .collect();
    out.sort();
    out.dedup();
    out
}
