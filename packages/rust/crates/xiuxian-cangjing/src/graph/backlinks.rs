use std::collections::{BTreeSet, HashMap};

use super::edges::derive_edges;
use crate::note::models::NoteDocument;
use crate::note::resolve::LookupTables;

/// Reverse edge index: target path to the set of linking sources.
#[derive(Debug, Clone, Default)]
pub struct BacklinkIndex {
    incoming: HashMap<String, BTreeSet<String>>,
    edge_count: usize,
}

impl BacklinkIndex {
    /// Rebuild from the current document set.
    pub fn build<'a, I>(documents: I, lookup: &LookupTables) -> Self
    where
        I: IntoIterator<Item = &'a NoteDocument>,
    {
        let mut index = Self::default();
        for doc in documents {
            let edges = derive_edges(doc, lookup);
            index.edge_count += edges.len();
            for edge in edges {
                index
                    .incoming
                    .entry(edge.target)
                    .or_default()
                    .insert(edge.source);
            }
        }
        index
    }

    /// Sorted sources linking to `target`.
    #[must_use]
    pub fn sources_of(&self, target: &str) -> Vec<String> {
        self.incoming
            .get(target)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of distinct linking sources.
    #[must_use]
    pub fn in_degree(&self, target: &str) -> usize {
        self.incoming.get(target).map_or(0, BTreeSet::len)
    }

    /// Total typed edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
