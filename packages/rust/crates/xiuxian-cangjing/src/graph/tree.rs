use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::note::NoteStore;
use crate::note::parser::folder_of;

/// Child ordering for [`directory_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSort {
    /// Alphabetical.
    #[default]
    Name,
    /// Most recently modified first.
    Recent,
    /// Largest note count first.
    Count,
}

fn default_tree_depth() -> usize {
    3
}
fn default_child_limit() -> usize {
    50
}

/// Directory tree request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRequest {
    /// Subtree root; empty means the vault root.
    #[serde(default)]
    pub folder: Option<String>,
    /// Levels below the subtree root.
    #[serde(default = "default_tree_depth")]
    pub max_depth: usize,
    /// Child ordering.
    #[serde(default)]
    pub sort: TreeSort,
    /// Children kept per folder.
    #[serde(default = "default_child_limit")]
    pub child_limit: usize,
}

impl Default for TreeRequest {
    fn default() -> Self {
        Self {
            folder: None,
            max_depth: default_tree_depth(),
            sort: TreeSort::Name,
            child_limit: default_child_limit(),
        }
    }
}

/// Folder with aggregate counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Last path component (empty for the vault root).
    pub name: String,
    /// Folder path relative to the vault.
    pub path: String,
    /// Notes anywhere below this folder.
    pub note_count: usize,
    /// Newest modification time below this folder.
    pub latest_modified_ms: Option<i64>,
    /// Subfolders after sorting and limiting.
    pub children: Vec<DirectoryNode>,
    /// Subfolders dropped by the child limit or depth limit.
    pub omitted_children: usize,
}

#[derive(Default)]
struct FolderAgg {
    count: usize,
    latest: Option<i64>,
    children: BTreeSet<String>,
}

fn aggregate(store: &NoteStore) -> BTreeMap<String, FolderAgg> {
    let mut folders: BTreeMap<String, FolderAgg> = BTreeMap::new();
    folders.entry(String::new()).or_default();
    for doc in store.documents() {
        let mut folder = folder_of(&doc.path).to_string();
        loop {
            let agg = folders.entry(folder.clone()).or_default();
            agg.count += 1;
            agg.latest = Some(agg.latest.map_or(doc.modified_ms, |t| t.max(doc.modified_ms)));
            if folder.is_empty() {
                break;
            }
            let parent = folder_of(&folder).to_string();
            folders.entry(parent.clone()).or_default().children.insert(folder);
            folder = parent;
        }
    }
    folders
}

fn build_node(
    folders: &BTreeMap<String, FolderAgg>,
    path: &str,
    depth_left: usize,
    request: &TreeRequest,
) -> DirectoryNode {
    let agg = folders.get(path);
    let mut node = DirectoryNode {
        name: path.rsplit('/').next().unwrap_or_default().to_string(),
        path: path.to_string(),
        note_count: agg.map_or(0, |a| a.count),
        latest_modified_ms: agg.and_then(|a| a.latest),
        children: Vec::new(),
        omitted_children: 0,
    };
    let Some(agg) = agg else {
        return node;
    };
    if depth_left == 0 {
        node.omitted_children = agg.children.len();
        return node;
    }
    let mut children: Vec<DirectoryNode> = agg
        .children
        .iter()
        .map(|child| build_node(folders, child, depth_left - 1, request))
        .collect();
    match request.sort {
        TreeSort::Name => children.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        TreeSort::Recent => children.sort_by(|a, b| {
            b.latest_modified_ms
                .cmp(&a.latest_modified_ms)
                .then_with(|| a.name.cmp(&b.name))
        }),
        TreeSort::Count => children.sort_by(|a, b| {
            b.note_count
                .cmp(&a.note_count)
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
    let limit = request.child_limit.max(1);
    if children.len() > limit {
        node.omitted_children = children.len() - limit;
        children.truncate(limit);
    }
    node.children = children;
    node
}

/// Aggregate note counts per folder.
#[must_use]
pub fn directory_tree(store: &NoteStore, request: &TreeRequest) -> DirectoryNode {
    let folders = aggregate(store);
    let start = request
        .folder
        .as_deref()
        .map(|folder| folder.trim_matches('/').to_string())
        .unwrap_or_default();
    let start = folders
        .keys()
        .find(|key| key.eq_ignore_ascii_case(&start))
        .cloned()
        .unwrap_or(start);
    build_node(&folders, &start, request.max_depth, request)
}

/// Note directly inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Note path.
    pub path: String,
    /// Note title.
    pub title: String,
    /// Modification time.
    pub modified_ms: i64,
}

/// Immediate contents of one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderContents {
    /// Folder path.
    pub folder: String,
    /// Notes directly inside, by path.
    pub notes: Vec<FolderEntry>,
    /// Immediate subfolders, by path.
    pub folders: Vec<String>,
}

/// List notes and subfolders directly under `folder`.
#[must_use]
pub fn folder_contents(store: &NoteStore, folder: &str) -> FolderContents {
    let wanted = folder.trim_matches('/').to_lowercase();
    let mut notes = Vec::new();
    let mut subfolders: BTreeSet<String> = BTreeSet::new();
    for doc in store.documents() {
        let parent = folder_of(&doc.path);
        if parent.to_lowercase() == wanted {
            notes.push(FolderEntry {
                path: doc.path.clone(),
                title: doc.title.clone(),
                modified_ms: doc.modified_ms,
            });
            continue;
        }
        let rest = if wanted.is_empty() {
            Some(doc.path.as_str())
        } else if doc.path_lower.starts_with(&format!("{wanted}/")) {
            doc.path.get(wanted.len() + 1..)
        } else {
            None
        };
        if let Some((child, _)) = rest.and_then(|rest| rest.split_once('/')) {
            let full = if wanted.is_empty() {
                child.to_string()
            } else {
                format!("{}/{child}", doc.path.get(..wanted.len()).unwrap_or(&wanted))
            };
            subfolders.insert(full);
        }
    }
    FolderContents {
        folder: folder.trim_matches('/').to_string(),
        notes,
        folders: subfolders.into_iter().collect(),
    }
}
