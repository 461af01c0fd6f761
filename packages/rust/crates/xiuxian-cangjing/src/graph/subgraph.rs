use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::render::RenderFormat;
use super::{Direction, LinkGraph, relation_allowed};
use crate::note::NoteDocument;

fn default_snapshot_depth() -> usize {
    2
}
fn default_max_nodes() -> usize {
    300
}
fn default_max_edges() -> usize {
    1000
}

/// Ego or folder subgraph request. With neither `root` nor `folder` the whole
/// vault is treated as one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    /// Ego root reference.
    #[serde(default)]
    pub root: Option<String>,
    /// Folder prefix for folder mode.
    #[serde(default)]
    pub folder: Option<String>,
    /// Ego expansion depth.
    #[serde(default = "default_snapshot_depth")]
    pub depth: usize,
    /// Ego expansion direction.
    #[serde(default)]
    pub direction: Direction,
    /// Node cap.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Edge cap.
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    /// Keep only nodes under this path prefix.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Keep only nodes carrying every tag.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relation allow-list.
    #[serde(default)]
    pub relations: Option<Vec<String>>,
    /// Output rendering.
    #[serde(default)]
    pub format: RenderFormat,
}

impl Default for SnapshotRequest {
    fn default() -> Self {
        Self {
            root: None,
            folder: None,
            depth: default_snapshot_depth(),
            direction: Direction::Both,
            max_nodes: default_max_nodes(),
            max_edges: default_max_edges(),
            path_prefix: None,
            tags: Vec::new(),
            relations: None,
            format: RenderFormat::Json,
        }
    }
}

/// Node of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Note path.
    pub path: String,
    /// Note title.
    pub title: String,
    /// Note tags.
    pub tags: Vec<String>,
    /// Edges touching this node within the snapshot.
    pub degree: usize,
}

/// Deduplicated edge: one per ordered pair, all relations merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source path.
    pub source: String,
    /// Target path.
    pub target: String,
    /// Relations between the pair.
    pub relations: Vec<String>,
}

/// Bounded subgraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// `ego` or `folder`.
    pub mode: String,
    /// Resolved ego root.
    pub root: Option<String>,
    /// Nodes in path order (ego root first).
    pub nodes: Vec<GraphNode>,
    /// Edges in (source, target) order.
    pub edges: Vec<GraphEdge>,
    /// True when a node or edge cap was hit.
    pub truncated: bool,
    /// Near matches when the ego root did not resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

fn has_tag(doc: &NoteDocument, wanted: &str) -> bool {
    let wanted = wanted.trim_start_matches('#').to_lowercase();
    doc.tags.iter().any(|tag| {
        let tag = tag.to_lowercase();
        tag == wanted || tag.starts_with(&format!("{wanted}/"))
    })
}

fn node_passes(doc: &NoteDocument, request: &SnapshotRequest) -> bool {
    if let Some(prefix) = &request.path_prefix {
        let prefix = prefix.trim_matches('/').to_lowercase();
        if !prefix.is_empty() && !doc.path_lower.starts_with(&prefix) {
            return false;
        }
    }
    request.tags.iter().all(|tag| has_tag(doc, tag))
}

fn ego_members(graph: &LinkGraph<'_>, root: &str, request: &SnapshotRequest) -> (Vec<String>, bool) {
    let relations = request.relations.as_deref();
    let max_nodes = request.max_nodes.max(1);
    let mut members = vec![root.to_string()];
    let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(root.to_string(), 0)]);
    let mut truncated = false;
    while let Some((node, depth)) = queue.pop_front() {
        if depth >= request.depth {
            continue;
        }
        for hop in graph.hops(&node, request.direction, relations) {
            if !seen.insert(hop.node.clone()) {
                continue;
            }
            let passes = graph
                .store()
                .get(&hop.node)
                .is_some_and(|doc| node_passes(doc, request));
            if passes {
                if members.len() >= max_nodes {
                    truncated = true;
                    return (members, truncated);
                }
                members.push(hop.node.clone());
            }
            queue.push_back((hop.node, depth + 1));
        }
    }
    (members, truncated)
}

fn folder_members(graph: &LinkGraph<'_>, folder: &str, request: &SnapshotRequest) -> (Vec<String>, bool) {
    let folder = folder.trim_matches('/').to_lowercase();
    let mut members: Vec<String> = graph
        .store()
        .documents()
        .filter(|doc| folder.is_empty() || doc.path_lower.starts_with(&format!("{folder}/")))
        .filter(|doc| node_passes(doc, request))
        .map(|doc| doc.path.clone())
        .collect();
    let max_nodes = request.max_nodes.max(1);
    let truncated = members.len() > max_nodes;
    members.truncate(max_nodes);
    (members, truncated)
}

/// Build an ego graph (when `root` is set) or a folder subgraph.
#[must_use]
pub fn graph_snapshot(graph: &LinkGraph<'_>, request: &SnapshotRequest) -> GraphSnapshot {
    let (mode, root, (members, mut truncated)) = if let Some(root_ref) = &request.root {
        let resolution = graph.store().resolve(root_ref);
        let Some(root) = resolution.path else {
            return GraphSnapshot {
                mode: "ego".to_string(),
                suggestions: resolution.suggestions,
                ..GraphSnapshot::default()
            };
        };
        let members = ego_members(graph, &root, request);
        ("ego", Some(root), members)
    } else {
        let folder = request.folder.clone().unwrap_or_default();
        ("folder", None, folder_members(graph, &folder, request))
    };

    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
    let relations = request.relations.as_deref();
    let mut pairs: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for path in &members {
        for edge in graph.outgoing(path) {
            if !member_set.contains(edge.target.as_str())
                || !relation_allowed(&edge.relation, relations)
            {
                continue;
            }
            let key = (edge.source, edge.target);
            if !pairs.contains_key(&key) && pairs.len() >= request.max_edges {
                truncated = true;
                continue;
            }
            pairs.entry(key).or_default().insert(edge.relation);
        }
    }

    let mut degree: HashMap<&str, usize> = HashMap::new();
    for (source, target) in pairs.keys() {
        *degree.entry(source.as_str()).or_default() += 1;
        *degree.entry(target.as_str()).or_default() += 1;
    }
    let nodes = members
        .iter()
        .filter_map(|path| graph.store().get(path))
        .map(|doc| GraphNode {
            path: doc.path.clone(),
            title: doc.title.clone(),
            tags: doc.tags.clone(),
            degree: degree.get(doc.path.as_str()).copied().unwrap_or(0),
        })
        .collect();
    let edges = pairs
        .into_iter()
        .map(|((source, target), relations)| GraphEdge {
            source,
            target,
            relations: relations.into_iter().collect(),
        })
        .collect();

    GraphSnapshot {
        mode: mode.to_string(),
        root,
        nodes,
        edges,
        truncated,
        suggestions: Vec::new(),
    }
}
