//! Link graph queries over the note store.
//!
//! Edges are never stored; they are derived from each note's raw references
//! through the store's lookup tables, so a rename or new alias takes effect at
//! the next commit.

mod backlinks;
mod edges;
mod relations;
mod render;
mod subgraph;
mod traversal;
mod tree;

use serde::{Deserialize, Serialize};

pub use backlinks::BacklinkIndex;
pub use edges::{DanglingRef, Edge, XREF_RELATION, dangling_refs, derive_edges, field_relation};
pub use relations::{Relations, relations_of};
pub use render::{RenderFormat, render_mermaid, render_text};
pub use subgraph::{GraphEdge, GraphNode, GraphSnapshot, SnapshotRequest, graph_snapshot};
pub use traversal::{
    MAX_NEIGHBORHOOD_DEPTH, MAX_PATH_DEPTH, NeighborNode, Neighborhood, NeighborhoodRequest,
    PathRequest, PathStep, ShortestPath, neighborhood, shortest_path,
};
pub use tree::{
    DirectoryNode, FolderContents, FolderEntry, TreeRequest, TreeSort, directory_tree,
    folder_contents,
};

use crate::note::NoteStore;

/// Traversal direction relative to the current note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow links pointing at the note.
    #[serde(alias = "in", alias = "to")]
    Incoming,
    /// Follow links the note makes.
    #[serde(alias = "out", alias = "from")]
    Outgoing,
    /// Both ways.
    #[default]
    Both,
}

impl Direction {
    /// Parse direction aliases from user input.
    #[must_use]
    pub fn from_alias(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "to" | "in" | "incoming" => Self::Incoming,
            "from" | "out" | "outgoing" => Self::Outgoing,
            _ => Self::Both,
        }
    }
}

/// One step from a node to a neighbor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hop {
    /// Neighbor path.
    pub node: String,
    /// Relation carried by the edge.
    pub relation: String,
    /// True when the edge points at the current node.
    pub reversed: bool,
}

/// Whether `relation` passes an optional allow-list. A bare field name
/// (`related`) matches `field:related`.
#[must_use]
pub fn relation_allowed(relation: &str, allowed: Option<&[String]>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    if allowed.is_empty() {
        return true;
    }
    allowed.iter().any(|candidate| {
        let candidate = candidate.trim().to_lowercase();
        candidate == relation || field_relation(&candidate) == relation
    })
}

/// Read-only graph view borrowing the store.
#[derive(Debug, Clone, Copy)]
pub struct LinkGraph<'a> {
    store: &'a NoteStore,
}

impl<'a> LinkGraph<'a> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: &'a NoteStore) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &'a NoteStore {
        self.store
    }

    /// Edges leaving `path`.
    #[must_use]
    pub fn outgoing(&self, path: &str) -> Vec<Edge> {
        self.store
            .get(path)
            .map(|doc| derive_edges(doc, self.store.lookup()))
            .unwrap_or_default()
    }

    /// Edges arriving at `path`.
    #[must_use]
    pub fn incoming(&self, path: &str) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .store
            .backlinks()
            .sources_of(path)
            .iter()
            .flat_map(|source| self.outgoing(source))
            .filter(|edge| edge.target == path)
            .collect();
        edges.sort();
        edges
    }

    /// Neighbors of `path` in traversal order (path, then relation).
    #[must_use]
    pub fn hops(&self, path: &str, direction: Direction, relations: Option<&[String]>) -> Vec<Hop> {
        let mut hops: Vec<Hop> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            hops.extend(self.outgoing(path).into_iter().map(|edge| Hop {
                node: edge.target,
                relation: edge.relation,
                reversed: false,
            }));
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            hops.extend(self.incoming(path).into_iter().map(|edge| Hop {
                node: edge.source,
                relation: edge.relation,
                reversed: true,
            }));
        }
        hops.retain(|hop| relation_allowed(&hop.relation, relations));
        hops.sort();
        hops
    }

    /// Display title for a path, falling back to the path itself.
    #[must_use]
    pub fn title_of(&self, path: &str) -> String {
        self.store
            .get(path)
            .map_or_else(|| path.to_string(), |doc| doc.title.clone())
    }
}
