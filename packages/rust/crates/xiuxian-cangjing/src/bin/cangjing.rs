#![allow(missing_docs)]

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use xiuxian_cangjing::{
    Engine, EngineConfig, FailureKind, OperationFailure, resolve_config_path,
};

#[derive(Parser, Debug)]
#[command(
    name = "cangjing",
    about = "Cangjing knowledge-base CLI for note search, link graph and semantic recall",
    arg_required_else_help = true
)]
struct Cli {
    /// Vault root directory (overrides the configured root).
    #[arg(long, short = 'r', value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    /// Explicit config file path.
    ///
    /// Falls back to `$CANGJING_CONFIG`, then `<config dir>/cangjing/cangjing.yaml`.
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full-text search with field filters (`tag:x`, `"phrase"`, `+must`, `-not`).
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Resolve a path, title, alias or id.
    Resolve { note: String },
    /// Print a note's content and metadata.
    Get { note: String },
    /// Layered neighborhood of a note.
    Neighbors {
        note: String,
        #[arg(long, default_value_t = 1)]
        depth: usize,
        #[arg(long, default_value = "both")]
        direction: String,
        #[arg(long = "relation", value_name = "REL")]
        relations: Vec<String>,
    },
    /// Shortest link path between two notes.
    Path {
        from: String,
        to: String,
        #[arg(long, default_value_t = 5)]
        max_depth: usize,
        #[arg(long = "relation", value_name = "REL")]
        relations: Vec<String>,
        #[arg(long, default_value_t = false)]
        bidirectional: bool,
    },
    /// Ego or folder subgraph.
    Graph {
        #[arg(long)]
        root: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value_t = 2)]
        depth: usize,
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
    },
    /// Folder tree with note counts.
    Tree {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value_t = 3)]
        depth: usize,
        #[arg(long, default_value = "name")]
        sort: String,
    },
    /// Rescan the vault, or only files modified after `--since` (ms).
    Reindex {
        #[arg(long)]
        since: Option<i64>,
    },
    /// Hybrid semantic query.
    Semantic {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Compute missing embeddings.
    Embed {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Index counters.
    Stats,
    /// Run any operation with a JSON argument object.
    Exec {
        op: String,
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Serve newline-delimited JSON requests on stdin.
    Serve {
        /// Debounce tick interval in milliseconds.
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum GraphFormat {
    Json,
    Mermaid,
    Text,
}

impl GraphFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Mermaid => "mermaid",
            Self::Text => "text",
        }
    }
}

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    op: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<OperationFailure>,
}

impl Response {
    fn from_outcome(id: Option<Value>, outcome: Result<Value, OperationFailure>) -> Self {
        match outcome {
            Ok(result) => Self {
                id,
                ok: true,
                result: Some(result),
                error: None,
            },
            Err(failure) => Self {
                id,
                ok: false,
                result: None,
                error: Some(failure),
            },
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match resolve_config_path(cli.config_file.as_deref()) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root.clone_from(root);
    }
    Ok(config)
}

fn render<T: Serialize>(value: &T, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    println!("{}", render(value, output)?);
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Execute one operation; a panic becomes an `internal` failure.
fn guarded_execute(engine: &mut Engine, op: &str, args: Value) -> Result<Value, OperationFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.execute(op, args))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(OperationFailure::new(
            FailureKind::Internal,
            format!("{op} panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn handle_line(engine: &mut Engine, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            let outcome = guarded_execute(engine, &request.op, request.args);
            Response::from_outcome(request.id, outcome)
        }
        Err(err) => Response::from_outcome(
            None,
            Err(OperationFailure::new(
                FailureKind::InvalidInput,
                format!("malformed request: {err}"),
            )),
        ),
    }
}

async fn serve(engine: &mut Engine, tick: Duration) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("serving requests on stdin");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = engine.tick();
                if !report.is_idle() {
                    debug!("deferred work: {report:?}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read request from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = handle_line(engine, &line);
                let mut rendered = render(&response, OutputFormat::Json)?;
                rendered.push('\n');
                stdout
                    .write_all(rendered.as_bytes())
                    .await
                    .context("failed to write response")?;
                stdout.flush().await.context("failed to flush stdout")?;
            }
        }
    }

    let report = engine.flush();
    info!(
        "stdin closed; flushed {} pending reindex(es)",
        report.reindexed.len() + report.unchanged.len()
    );
    Ok(())
}

fn command_request(command: &Command) -> Result<(String, Value)> {
    let request = match command {
        Command::Search {
            query,
            limit,
            profile,
        } => (
            "search",
            json!({ "query": query, "limit": limit, "profile": profile }),
        ),
        Command::Resolve { note } => ("resolve", json!({ "note": note })),
        Command::Get { note } => ("get-content", json!({ "note": note })),
        Command::Neighbors {
            note,
            depth,
            direction,
            relations,
        } => (
            "neighborhood",
            json!({
                "note": note,
                "depth": depth,
                "direction": direction,
                "relations": (!relations.is_empty()).then_some(relations),
            }),
        ),
        Command::Path {
            from,
            to,
            max_depth,
            relations,
            bidirectional,
        } => (
            "shortest-path",
            json!({
                "from": from,
                "to": to,
                "max_depth": max_depth,
                "relations": (!relations.is_empty()).then_some(relations),
                "bidirectional": bidirectional,
            }),
        ),
        Command::Graph {
            root,
            folder,
            depth,
            format,
        } => (
            "graph-snapshot",
            json!({ "root": root, "folder": folder, "depth": depth, "format": format.as_str() }),
        ),
        Command::Tree {
            folder,
            depth,
            sort,
        } => (
            "directory-tree",
            json!({ "folder": folder, "max_depth": depth, "sort": sort.to_lowercase() }),
        ),
        Command::Reindex { since: Some(since) } => ("reindex-since", json!({ "since_ms": since })),
        Command::Reindex { since: None } => ("reindex-all", json!({})),
        Command::Semantic {
            query,
            top_k,
            offset,
        } => (
            "semantic-query",
            json!({ "query": query, "top_k": top_k, "offset": offset }),
        ),
        Command::Embed { limit } => ("semantic-build-index", json!({ "limit": limit })),
        Command::Stats => ("stats", json!({})),
        Command::Exec { op, args } => {
            let args: Value = serde_json::from_str(args)
                .with_context(|| format!("arguments for {op} are not valid JSON"))?;
            return Ok((op.clone(), args));
        }
        Command::Serve { .. } => anyhow::bail!("serve is not a single request"),
    };
    Ok((request.0.to_string(), request.1))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger();

    let config = load_config(&cli)?;
    let root = config.root.clone();
    let mut engine = Engine::open(config)
        .with_context(|| format!("failed to open vault at {}", root.display()))?;

    if let Command::Serve { tick_ms } = &cli.command {
        return serve(&mut engine, Duration::from_millis((*tick_ms).max(1))).await;
    }

    let (op, args) = command_request(&cli.command)?;
    let outcome = guarded_execute(&mut engine, &op, args);
    engine.flush();
    match outcome {
        Ok(result) => emit(&result, cli.output),
        Err(failure) => {
            emit(&json!({ "error": failure }), cli.output)?;
            anyhow::bail!("{op} failed: {}", failure.message)
        }
    }
}
