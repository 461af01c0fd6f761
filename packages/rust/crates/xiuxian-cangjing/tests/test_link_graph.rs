use std::fs;
use std::path::Path;

use tempfile::TempDir;
use xiuxian_cangjing::graph::{
    Direction, NeighborhoodRequest, PathRequest, SnapshotRequest, TreeRequest, TreeSort,
    directory_tree, folder_contents, graph_snapshot, neighborhood, relations_of, render_mermaid,
    render_text, shortest_path,
};
use xiuxian_cangjing::{EngineConfig, LinkGraph, NoteStore};

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// alpha -> beta -> gamma by body links; delta -> alpha by a `related` field.
fn chain_store(root: &Path) -> Result<NoteStore, Box<dyn std::error::Error>> {
    write_file(&root.join("alpha.md"), "# Alpha\n\nSee [[beta]].\n")?;
    write_file(&root.join("beta.md"), "# Beta\n\nThen [[gamma]].\n")?;
    write_file(&root.join("gamma.md"), "# Gamma\n\nThe end.\n")?;
    write_file(
        &root.join("delta.md"),
        "---\nrelated: [\"[[alpha]]\"]\n---\n# Delta\n\nPoints at [[nowhere]].\n",
    )?;
    let mut store = NoteStore::open(&EngineConfig::with_root(root))?;
    store.load_all()?;
    Ok(store)
}

fn layer_paths(layer: &[xiuxian_cangjing::graph::NeighborNode]) -> Vec<&str> {
    layer.iter().map(|node| node.path.as_str()).collect()
}

#[test]
fn test_neighborhood_layers_follow_direction() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let store = chain_store(tmp.path())?;
    let graph = LinkGraph::new(&store);

    let mut request = NeighborhoodRequest::new("alpha");
    request.depth = 2;
    request.direction = Direction::Outgoing;
    let outgoing = neighborhood(&graph, &request);
    assert_eq!(outgoing.root.as_deref(), Some("alpha.md"));
    assert_eq!(outgoing.layers.len(), 2);
    assert_eq!(layer_paths(&outgoing.layers[0]), vec!["beta.md"]);
    assert_eq!(layer_paths(&outgoing.layers[1]), vec!["gamma.md"]);
    assert_eq!(outgoing.node_count, 3);
    assert!(!outgoing.truncated);

    let mut incoming = NeighborhoodRequest::new("gamma");
    incoming.depth = 2;
    incoming.direction = Direction::Incoming;
    let upstream = neighborhood(&graph, &incoming);
    assert_eq!(layer_paths(&upstream.layers[0]), vec!["beta.md"]);
    assert_eq!(layer_paths(&upstream.layers[1]), vec!["alpha.md"]);
    assert!(upstream.layers[0][0].reversed);

    let both = neighborhood(&graph, &NeighborhoodRequest::new("alpha"));
    assert_eq!(layer_paths(&both.layers[0]), vec!["beta.md", "delta.md"]);
    assert_eq!(both.layers[0][1].relation, "field:related");
    Ok(())
}

#[test]
fn test_neighborhood_fan_out_marks_truncation() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("hub.md"),
        "# Hub\n\n[[one]] [[two]] [[three]]\n",
    )?;
    for name in ["one", "two", "three"] {
        write_file(&tmp.path().join(format!("{name}.md")), &format!("# {name}\n"))?;
    }
    let mut store = NoteStore::open(&EngineConfig::with_root(tmp.path()))?;
    store.load_all()?;
    let graph = LinkGraph::new(&store);

    let mut request = NeighborhoodRequest::new("hub");
    request.fan_out = 2;
    let result = neighborhood(&graph, &request);
    assert_eq!(result.layers[0].len(), 2);
    assert!(result.truncated);

    let unknown = neighborhood(&graph, &NeighborhoodRequest::new("hu"));
    assert!(unknown.root.is_none());
    assert_eq!(unknown.suggestions, vec!["hub.md".to_string()]);
    Ok(())
}

#[test]
fn test_neighborhood_node_budget_and_depth_limit() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("hub.md"),
        "# Hub\n\n[[one]] [[two]] [[three]]\n",
    )?;
    for name in ["one", "two", "three"] {
        write_file(&tmp.path().join(format!("{name}.md")), &format!("# {name}\n"))?;
    }
    for step in 0..8 {
        write_file(
            &tmp.path().join(format!("step{step}.md")),
            &format!("# Step {step}\n\n[[step{}]]\n", step + 1),
        )?;
    }
    write_file(&tmp.path().join("step8.md"), "# Step 8\n")?;
    let mut store = NoteStore::open(&EngineConfig::with_root(tmp.path()))?;
    store.load_all()?;
    let graph = LinkGraph::new(&store);

    let mut request = NeighborhoodRequest::new("hub");
    request.node_budget = 2;
    let budgeted = neighborhood(&graph, &request);
    assert_eq!(budgeted.node_count, 2);
    assert_eq!(budgeted.layers.len(), 1);
    assert_eq!(budgeted.layers[0].len(), 1);
    assert!(budgeted.truncated);

    let mut deep = NeighborhoodRequest::new("step0");
    deep.depth = 20;
    deep.direction = Direction::Outgoing;
    let clamped = neighborhood(&graph, &deep);
    assert_eq!(clamped.depth, 6);
    assert_eq!(clamped.layers.len(), 6);
    assert!(clamped.truncated);

    let mut short = NeighborhoodRequest::new("step5");
    short.depth = 20;
    short.direction = Direction::Outgoing;
    let exhausted = neighborhood(&graph, &short);
    assert_eq!(exhausted.layers.len(), 3);
    assert!(!exhausted.truncated);
    Ok(())
}

#[test]
fn test_shortest_path_respects_relations_and_direction() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let store = chain_store(tmp.path())?;
    let graph = LinkGraph::new(&store);

    let found = shortest_path(&graph, &PathRequest::new("alpha", "gamma"));
    assert!(found.found);
    assert_eq!(found.path, vec!["alpha.md", "beta.md", "gamma.md"]);
    assert_eq!(found.steps.len(), 2);

    let mut field_only = PathRequest::new("alpha", "gamma");
    field_only.relations = Some(vec!["field:related".to_string()]);
    let blocked = shortest_path(&graph, &field_only);
    assert!(!blocked.found);
    assert!(blocked.path.is_empty());

    let mut by_field = PathRequest::new("delta", "alpha");
    by_field.relations = Some(vec!["related".to_string()]);
    assert!(shortest_path(&graph, &by_field).found);

    let backwards = shortest_path(&graph, &PathRequest::new("gamma", "alpha"));
    assert!(!backwards.found);
    let mut undirected = PathRequest::new("gamma", "alpha");
    undirected.bidirectional = true;
    let walked = shortest_path(&graph, &undirected);
    assert!(walked.found);
    assert!(walked.steps.iter().all(|step| step.reversed));

    let mut shallow = PathRequest::new("alpha", "gamma");
    shallow.max_depth = 1;
    assert!(!shortest_path(&graph, &shallow).found);
    Ok(())
}

#[test]
fn test_relations_report_dangling_and_backlinks() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let store = chain_store(tmp.path())?;
    let graph = LinkGraph::new(&store);

    let delta = relations_of(&graph, "delta");
    assert_eq!(
        delta.outgoing.get("field:related"),
        Some(&vec!["alpha.md".to_string()])
    );
    assert_eq!(delta.dangling.len(), 1);
    assert_eq!(delta.dangling[0].target, "nowhere");
    assert_eq!(delta.dangling[0].relation, "xref");

    let alpha = relations_of(&graph, "alpha");
    assert_eq!(alpha.incoming.get("field:related"), Some(&vec!["delta.md".to_string()]));
    assert_eq!(alpha.outgoing.get("xref"), Some(&vec!["beta.md".to_string()]));
    Ok(())
}

#[test]
fn test_snapshot_modes_and_rendering() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let store = chain_store(tmp.path())?;
    let graph = LinkGraph::new(&store);

    let ego = graph_snapshot(
        &graph,
        &SnapshotRequest {
            root: Some("beta".to_string()),
            depth: 1,
            ..SnapshotRequest::default()
        },
    );
    assert_eq!(ego.mode, "ego");
    let mut members: Vec<&str> = ego.nodes.iter().map(|node| node.path.as_str()).collect();
    members.sort_unstable();
    assert_eq!(members, vec!["alpha.md", "beta.md", "gamma.md"]);
    assert_eq!(ego.edges.len(), 2);

    let whole = graph_snapshot(&graph, &SnapshotRequest::default());
    assert_eq!(whole.mode, "folder");
    assert_eq!(whole.nodes.len(), 4);
    assert_eq!(whole.edges.len(), 3);

    let capped = graph_snapshot(
        &graph,
        &SnapshotRequest {
            max_nodes: 2,
            ..SnapshotRequest::default()
        },
    );
    assert!(capped.truncated);
    assert_eq!(capped.nodes.len(), 2);

    let edge_capped = graph_snapshot(
        &graph,
        &SnapshotRequest {
            max_edges: 1,
            ..SnapshotRequest::default()
        },
    );
    assert!(edge_capped.truncated);
    assert_eq!(edge_capped.edges.len(), 1);
    assert_eq!(edge_capped.nodes.len(), 4);

    let mermaid = render_mermaid(&ego);
    assert!(mermaid.starts_with("graph LR\n"));
    assert!(mermaid.contains("-->|xref|"));
    let text = render_text(&whole, 2);
    assert!(text.starts_with("4 notes, 3 links\n"));
    assert!(text.contains("1. Alpha (alpha.md) - 2 links"));
    Ok(())
}

#[test]
fn test_directory_tree_and_folder_contents() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("root.md"), "# Root\n")?;
    write_file(&tmp.path().join("projects/one.md"), "# One\n")?;
    write_file(&tmp.path().join("projects/two.md"), "# Two\n")?;
    write_file(&tmp.path().join("projects/archive/old.md"), "# Old\n")?;
    write_file(&tmp.path().join("areas/health.md"), "# Health\n")?;
    let mut store = NoteStore::open(&EngineConfig::with_root(tmp.path()))?;
    store.load_all()?;

    let tree = directory_tree(&store, &TreeRequest::default());
    assert_eq!(tree.note_count, 5);
    let names: Vec<&str> = tree.children.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec!["areas", "projects"]);

    let by_count = directory_tree(
        &store,
        &TreeRequest {
            sort: TreeSort::Count,
            max_depth: 1,
            ..TreeRequest::default()
        },
    );
    assert_eq!(by_count.children[0].path, "projects");
    assert_eq!(by_count.children[0].note_count, 3);
    assert_eq!(by_count.children[0].omitted_children, 1);

    let contents = folder_contents(&store, "projects");
    let notes: Vec<&str> = contents.notes.iter().map(|entry| entry.path.as_str()).collect();
    assert_eq!(notes, vec!["projects/one.md", "projects/two.md"]);
    assert_eq!(contents.folders, vec!["projects/archive".to_string()]);

    let top = folder_contents(&store, "");
    assert_eq!(top.notes.len(), 1);
    assert_eq!(top.folders, vec!["areas".to_string(), "projects".to_string()]);
    Ok(())
}
