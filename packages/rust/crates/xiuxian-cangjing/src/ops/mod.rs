//! Named-operation boundary: `(op, args)` in, JSON result or typed failure out.

pub mod mutation;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

pub use mutation::{
    DeleteReport, LINKS_HEADING, MoveReport, MutationReport, RepairReport, RepairedLink,
    UnresolvedLink, append_under_heading,
};

use crate::Engine;
use crate::error::{OperationFailure, VaultError, VaultResult};
use crate::graph::{
    NeighborhoodRequest, PathRequest, RenderFormat, SnapshotRequest, TreeRequest, render_mermaid,
    render_text,
};
use crate::search::RankingProfile;
use crate::semantic::SemanticQuery;

/// Every operation name accepted by [`Engine::execute`].
pub const OPERATIONS: &[&str] = &[
    "search",
    "get-content",
    "resolve",
    "write",
    "append-under-heading",
    "link",
    "unlink",
    "upsert-frontmatter",
    "capture",
    "journal-append",
    "move",
    "clone",
    "delete",
    "repair-links",
    "reindex-all",
    "reindex-one",
    "reindex-since",
    "notify-changed",
    "relations-of",
    "neighborhood",
    "graph-snapshot",
    "shortest-path",
    "directory-tree",
    "folder-contents",
    "embed-upsert",
    "semantic-query",
    "semantic-build-index",
    "stats",
];

const TEXT_SUMMARY_TOP: usize = 10;

/// Parse an operation's argument object; `null` counts as `{}`.
///
/// # Errors
/// Returns `InvalidInput` naming the operation when the arguments do not fit.
pub fn parse_args<T: DeserializeOwned>(operation: &str, args: Value) -> VaultResult<T> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|err| VaultError::invalid(format!("{operation}: {err}")))
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    profile: Option<String>,
}

#[derive(Deserialize)]
struct NoteArgs {
    note: String,
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
    #[serde(default)]
    create_only: bool,
}

#[derive(Deserialize)]
struct AppendArgs {
    note: String,
    heading: String,
    text: String,
}

#[derive(Deserialize)]
struct LinkArgs {
    from: String,
    to: String,
    #[serde(default)]
    relation: Option<String>,
}

#[derive(Deserialize)]
struct FrontmatterArgs {
    note: String,
    #[serde(default)]
    set: Map<String, Value>,
    #[serde(default)]
    remove: Vec<String>,
}

#[derive(Deserialize)]
struct CaptureArgs {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    related: Vec<String>,
}

#[derive(Deserialize)]
struct JournalArgs {
    text: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct MoveArgs {
    from: String,
    to: String,
}

#[derive(Deserialize)]
struct CloneArgs {
    note: String,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct RepairArgs {
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Deserialize)]
struct SinceArgs {
    since_ms: i64,
}

#[derive(Deserialize)]
struct FolderArgs {
    #[serde(default)]
    folder: String,
}

#[derive(Deserialize)]
struct EmbedArgs {
    note: String,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct BuildIndexArgs {
    #[serde(default)]
    limit: Option<usize>,
}

fn to_json<T: Serialize>(value: &T) -> VaultResult<Value> {
    Ok(serde_json::to_value(value)?)
}

impl Engine {
    /// Execute one named operation.
    ///
    /// # Errors
    /// Returns an [`OperationFailure`] whose kind follows the error taxonomy;
    /// unknown operation names are `invalid_input`.
    pub fn execute(&mut self, operation: &str, args: Value) -> Result<Value, OperationFailure> {
        self.dispatch(operation, args).map_err(OperationFailure::from)
    }

    fn dispatch(&mut self, op: &str, args: Value) -> VaultResult<Value> {
        match op {
            "search" => {
                let args: SearchArgs = parse_args(op, args)?;
                let profile = args.profile.as_deref().map(RankingProfile::from_alias);
                to_json(&self.search(&args.query, args.limit, profile)?)
            }
            "get-content" => {
                let args: NoteArgs = parse_args(op, args)?;
                to_json(&self.get_content(&args.note)?)
            }
            "resolve" => {
                let args: NoteArgs = parse_args(op, args)?;
                if args.note.trim().is_empty() {
                    return Err(VaultError::invalid("note must not be empty"));
                }
                to_json(&self.resolve(&args.note))
            }
            "write" => {
                let args: WriteArgs = parse_args(op, args)?;
                to_json(&self.write(&args.path, &args.content, args.create_only)?)
            }
            "append-under-heading" => {
                let args: AppendArgs = parse_args(op, args)?;
                to_json(&self.append_under_heading(&args.note, &args.heading, &args.text)?)
            }
            "link" => {
                let args: LinkArgs = parse_args(op, args)?;
                to_json(&self.link(&args.from, &args.to, args.relation.as_deref())?)
            }
            "unlink" => {
                let args: LinkArgs = parse_args(op, args)?;
                to_json(&self.unlink(&args.from, &args.to, args.relation.as_deref())?)
            }
            "upsert-frontmatter" => {
                let args: FrontmatterArgs = parse_args(op, args)?;
                to_json(&self.upsert_frontmatter(&args.note, &args.set, &args.remove)?)
            }
            "capture" => {
                let args: CaptureArgs = parse_args(op, args)?;
                to_json(&self.capture(&args.title, &args.body, &args.tags, &args.related)?)
            }
            "journal-append" => {
                let args: JournalArgs = parse_args(op, args)?;
                to_json(&self.journal_append(&args.text, args.date.as_deref())?)
            }
            "move" => {
                let args: MoveArgs = parse_args(op, args)?;
                to_json(&self.move_note(&args.from, &args.to)?)
            }
            "clone" => {
                let args: CloneArgs = parse_args(op, args)?;
                to_json(&self.clone_note(&args.note, args.to.as_deref(), args.title.as_deref())?)
            }
            "delete" => {
                let args: NoteArgs = parse_args(op, args)?;
                to_json(&self.delete(&args.note)?)
            }
            "repair-links" => {
                let args: RepairArgs = parse_args(op, args)?;
                to_json(&self.repair_links(args.note.as_deref(), args.dry_run)?)
            }
            "reindex-all" => to_json(&self.reindex_all()?),
            "reindex-one" => {
                let args: PathArgs = parse_args(op, args)?;
                let outcome = self.reindex_one(&args.path)?;
                Ok(json!({ "path": args.path, "outcome": outcome, "revision": self.revision() }))
            }
            "reindex-since" => {
                let args: SinceArgs = parse_args(op, args)?;
                to_json(&self.reindex_since(args.since_ms)?)
            }
            "notify-changed" => {
                let args: PathArgs = parse_args(op, args)?;
                let replaced = self.notify_changed(&args.path)?;
                Ok(json!({ "path": args.path, "scheduled": true, "replaced": replaced }))
            }
            "relations-of" => {
                let args: NoteArgs = parse_args(op, args)?;
                to_json(&self.relations_of(&args.note)?)
            }
            "neighborhood" => {
                let request: NeighborhoodRequest = parse_args(op, args)?;
                to_json(&self.neighborhood(&request)?)
            }
            "graph-snapshot" => {
                let request: SnapshotRequest = parse_args(op, args)?;
                let snapshot = self.graph_snapshot(&request)?;
                match request.format {
                    RenderFormat::Json => to_json(&snapshot),
                    RenderFormat::Mermaid => Ok(json!({
                        "format": "mermaid",
                        "content": render_mermaid(&snapshot),
                        "truncated": snapshot.truncated,
                    })),
                    RenderFormat::Text => Ok(json!({
                        "format": "text",
                        "content": render_text(&snapshot, TEXT_SUMMARY_TOP),
                        "truncated": snapshot.truncated,
                    })),
                }
            }
            "shortest-path" => {
                let request: PathRequest = parse_args(op, args)?;
                to_json(&self.shortest_path(&request)?)
            }
            "directory-tree" => {
                let request: TreeRequest = parse_args(op, args)?;
                to_json(&self.directory_tree(&request)?)
            }
            "folder-contents" => {
                let args: FolderArgs = parse_args(op, args)?;
                to_json(&self.folder_contents(&args.folder)?)
            }
            "embed-upsert" => {
                let args: EmbedArgs = parse_args(op, args)?;
                let (path, dimension) = self.embed_upsert(&args.note, args.vector)?;
                Ok(json!({ "path": path, "dimension": dimension }))
            }
            "semantic-query" => {
                let request: SemanticQuery = parse_args(op, args)?;
                to_json(&self.semantic_query(&request)?)
            }
            "semantic-build-index" => {
                let args: BuildIndexArgs = parse_args(op, args)?;
                to_json(&self.semantic_build_index(args.limit)?)
            }
            "stats" => to_json(&self.stats()),
            unknown => Err(VaultError::invalid(format!("unknown operation: {unknown}"))),
        }
    }
}
