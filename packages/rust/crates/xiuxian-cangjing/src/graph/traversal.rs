use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Direction, LinkGraph};

/// Hard cap on shortest-path search depth.
pub const MAX_PATH_DEPTH: usize = 6;
const DEFAULT_PATH_DEPTH: usize = 5;
/// Deepest neighborhood expansion; deeper requests are clamped and reported
/// as truncated when nodes remain beyond the limit.
pub const MAX_NEIGHBORHOOD_DEPTH: usize = 6;

fn default_depth() -> usize {
    1
}
fn default_fan_out() -> usize {
    30
}
fn default_node_budget() -> usize {
    300
}
fn default_path_depth() -> usize {
    DEFAULT_PATH_DEPTH
}

/// Layered neighborhood request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodRequest {
    /// Root note reference.
    pub note: String,
    /// Layers to expand.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Edge direction.
    #[serde(default)]
    pub direction: Direction,
    /// Per-node neighbor cap.
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
    /// Global node cap, root included.
    #[serde(default = "default_node_budget")]
    pub node_budget: usize,
    /// Relation allow-list.
    #[serde(default)]
    pub relations: Option<Vec<String>>,
}

impl NeighborhoodRequest {
    /// Defaults around `note`.
    pub fn new(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            depth: default_depth(),
            direction: Direction::Both,
            fan_out: default_fan_out(),
            node_budget: default_node_budget(),
            relations: None,
        }
    }
}

/// A discovered neighbor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborNode {
    /// Note path.
    pub path: String,
    /// Note title.
    pub title: String,
    /// Layer index (1-based).
    pub distance: usize,
    /// Node it was reached from.
    pub parent: String,
    /// Relation of the connecting edge.
    pub relation: String,
    /// True when the connecting edge points toward the parent.
    pub reversed: bool,
}

/// Layered BFS result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighborhood {
    /// Resolved root path.
    pub root: Option<String>,
    /// Layers by distance.
    pub layers: Vec<Vec<NeighborNode>>,
    /// Nodes returned, root included.
    pub node_count: usize,
    /// Layers expanded after clamping to [`MAX_NEIGHBORHOOD_DEPTH`].
    pub depth: usize,
    /// True when fan-out, budget or the depth clamp dropped nodes.
    pub truncated: bool,
    /// Near matches when the root did not resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Layered BFS bounded by per-node fan-out and a global budget.
#[must_use]
pub fn neighborhood(graph: &LinkGraph<'_>, request: &NeighborhoodRequest) -> Neighborhood {
    let resolution = graph.store().resolve(&request.note);
    let Some(root) = resolution.path else {
        return Neighborhood {
            suggestions: resolution.suggestions,
            ..Neighborhood::default()
        };
    };
    let depth = request.depth.clamp(1, MAX_NEIGHBORHOOD_DEPTH);
    let fan_out = request.fan_out.max(1);
    let budget = request.node_budget.max(1);
    let relations = request.relations.as_deref();

    let mut visited: HashSet<String> = HashSet::from([root.clone()]);
    let mut frontier = vec![root.clone()];
    let mut layers: Vec<Vec<NeighborNode>> = Vec::new();
    let mut truncated = false;

    'layers: for distance in 1..=depth {
        let mut layer: Vec<NeighborNode> = Vec::new();
        for node in &frontier {
            let mut taken = 0usize;
            for hop in graph.hops(node, request.direction, relations) {
                if visited.contains(&hop.node) {
                    continue;
                }
                if taken >= fan_out {
                    truncated = true;
                    break;
                }
                if visited.len() >= budget {
                    truncated = true;
                    if !layer.is_empty() {
                        layers.push(std::mem::take(&mut layer));
                    }
                    break 'layers;
                }
                visited.insert(hop.node.clone());
                taken += 1;
                layer.push(NeighborNode {
                    title: graph.title_of(&hop.node),
                    path: hop.node,
                    distance,
                    parent: node.clone(),
                    relation: hop.relation,
                    reversed: hop.reversed,
                });
            }
        }
        if layer.is_empty() {
            frontier.clear();
            break;
        }
        frontier = layer.iter().map(|n| n.path.clone()).collect();
        layers.push(layer);
    }

    if !truncated && request.depth > depth {
        truncated = frontier.iter().any(|node| {
            graph
                .hops(node, request.direction, relations)
                .iter()
                .any(|hop| !visited.contains(&hop.node))
        });
        if truncated {
            debug!("neighborhood depth {} clamped to {depth}", request.depth);
        }
    }

    Neighborhood {
        root: Some(root),
        node_count: visited.len(),
        depth,
        layers,
        truncated,
        suggestions: Vec::new(),
    }
}

/// Shortest-path request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Start reference.
    pub from: String,
    /// Goal reference.
    pub to: String,
    /// Depth limit, clamped to [`MAX_PATH_DEPTH`].
    #[serde(default = "default_path_depth")]
    pub max_depth: usize,
    /// Relation allow-list.
    #[serde(default)]
    pub relations: Option<Vec<String>>,
    /// Also walk edges backwards.
    #[serde(default)]
    pub bidirectional: bool,
}

impl PathRequest {
    /// Directed search with default depth.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            max_depth: DEFAULT_PATH_DEPTH,
            relations: None,
            bidirectional: false,
        }
    }
}

/// One edge on a found path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Step start.
    pub from: String,
    /// Step end.
    pub to: String,
    /// Relation walked.
    pub relation: String,
    /// True when walked against edge direction.
    pub reversed: bool,
}

/// Shortest-path outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortestPath {
    /// Resolved start.
    pub source: Option<String>,
    /// Resolved goal.
    pub target: Option<String>,
    /// Whether a path exists within the depth limit.
    pub found: bool,
    /// Node sequence, both ends included.
    pub path: Vec<String>,
    /// Edges walked.
    pub steps: Vec<PathStep>,
    /// Suggestions for whichever end failed to resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// BFS with a parent map; depth is clamped to [`MAX_PATH_DEPTH`].
#[must_use]
pub fn shortest_path(graph: &LinkGraph<'_>, request: &PathRequest) -> ShortestPath {
    let store = graph.store();
    let from = store.resolve(&request.from);
    let to = store.resolve(&request.to);
    let (Some(source), Some(target)) = (from.path.clone(), to.path.clone()) else {
        let mut suggestions = from.suggestions;
        suggestions.extend(to.suggestions);
        return ShortestPath {
            source: from.path,
            target: to.path,
            suggestions,
            ..ShortestPath::default()
        };
    };
    if source == target {
        return ShortestPath {
            path: vec![source.clone()],
            source: Some(source),
            target: Some(target),
            found: true,
            ..ShortestPath::default()
        };
    }

    let max_depth = request.max_depth.clamp(1, MAX_PATH_DEPTH);
    let direction = if request.bidirectional {
        Direction::Both
    } else {
        Direction::Outgoing
    };
    let relations = request.relations.as_deref();
    let mut parents: HashMap<String, PathStep> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::from([source.clone()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(source.clone(), 0)]);
    let mut found = false;

    'search: while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for hop in graph.hops(&node, direction, relations) {
            if !visited.insert(hop.node.clone()) {
                continue;
            }
            parents.insert(
                hop.node.clone(),
                PathStep {
                    from: node.clone(),
                    to: hop.node.clone(),
                    relation: hop.relation,
                    reversed: hop.reversed,
                },
            );
            if hop.node == target {
                found = true;
                break 'search;
            }
            queue.push_back((hop.node, depth + 1));
        }
    }

    let mut steps: Vec<PathStep> = Vec::new();
    if found {
        let mut cursor = target.clone();
        while let Some(step) = parents.get(&cursor) {
            cursor.clone_from(&step.from);
            steps.push(step.clone());
        }
        steps.reverse();
    }
    let mut path = Vec::new();
    if let Some(first) = steps.first() {
        path.push(first.from.clone());
        path.extend(steps.iter().map(|step| step.to.clone()));
    }
    ShortestPath {
        source: Some(source),
        target: Some(target),
        found,
        path,
        steps,
        suggestions: Vec::new(),
    }
}
