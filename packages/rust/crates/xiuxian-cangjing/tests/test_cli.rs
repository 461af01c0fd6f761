//! Integration tests for the `cangjing` CLI binary.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn cangjing_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cangjing"));
    cmd.env_remove("CANGJING_CONFIG");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn seed_vault(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write_file(
        &root.join("notes/alpha.md"),
        "# Alpha Note\n\nReference [[beta]] about orchards.\n",
    )?;
    write_file(
        &root.join("notes/beta.md"),
        "---\ntitle: Beta Knowledge\ntags: [rust]\n---\n\nBack to [[alpha]].\n",
    )?;
    Ok(())
}

#[test]
fn test_cangjing_search_returns_matches() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_vault(tmp.path())?;

    let output = cangjing_cmd()
        .arg("--root")
        .arg(tmp.path())
        .arg("search")
        .arg("orchards")
        .arg("--limit")
        .arg("5")
        .output()?;

    assert!(
        output.status.success(),
        "cangjing search failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: Value = serde_json::from_str(&String::from_utf8(output.stdout)?)?;
    assert_eq!(payload.get("query").and_then(Value::as_str), Some("orchards"));
    assert_eq!(payload.get("limit").and_then(Value::as_u64), Some(5));
    let results = payload
        .get("results")
        .and_then(Value::as_array)
        .ok_or("missing results")?;
    assert_eq!(
        results[0].get("path").and_then(Value::as_str),
        Some("notes/alpha.md")
    );
    Ok(())
}

#[test]
fn test_cangjing_resolve_and_exec_stats() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_vault(tmp.path())?;

    let output = cangjing_cmd()
        .arg("--root")
        .arg(tmp.path())
        .arg("resolve")
        .arg("Beta Knowledge")
        .output()?;
    assert!(output.status.success());
    let resolved: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        resolved.get("path").and_then(Value::as_str),
        Some("notes/beta.md")
    );
    assert_eq!(
        resolved.get("matched_by").and_then(Value::as_str),
        Some("title")
    );

    let output = cangjing_cmd()
        .arg("--root")
        .arg(tmp.path())
        .arg("exec")
        .arg("stats")
        .output()?;
    assert!(output.status.success());
    let stats: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats.get("documents").and_then(Value::as_u64), Some(2));
    assert_eq!(stats.get("edges").and_then(Value::as_u64), Some(2));
    assert!(tmp.path().join(".cangjing/index.json").is_file());
    Ok(())
}

#[test]
fn test_cangjing_failure_exits_nonzero_with_error_kind() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_vault(tmp.path())?;

    let output = cangjing_cmd()
        .arg("--root")
        .arg(tmp.path())
        .arg("get")
        .arg("nonexistent")
        .output()?;
    assert!(!output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        payload
            .get("error")
            .and_then(|error| error.get("kind"))
            .and_then(Value::as_str),
        Some("not_found")
    );
    Ok(())
}

#[test]
fn test_cangjing_reads_root_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let vault = tmp.path().join("vault");
    seed_vault(&vault)?;
    let config = tmp.path().join("cangjing.yaml");
    write_file(
        &config,
        &format!("root: \"{}\"\nsearch_limit: 1\n", vault.display()),
    )?;

    let output = cangjing_cmd()
        .arg("--conf")
        .arg(&config)
        .arg("search")
        .arg("alpha")
        .output()?;
    assert!(
        output.status.success(),
        "cangjing search failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload.get("limit").and_then(Value::as_u64), Some(1));
    Ok(())
}

#[test]
fn test_cangjing_serve_answers_each_line() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_vault(tmp.path())?;

    let mut child = cangjing_cmd()
        .arg("--root")
        .arg(tmp.path())
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    {
        let stdin = child.stdin.as_mut().ok_or("stdin not piped")?;
        stdin.write_all(b"{\"id\":1,\"op\":\"resolve\",\"args\":{\"note\":\"alpha\"}}\n")?;
        stdin.write_all(b"\n")?;
        stdin.write_all(b"{\"id\":\"two\",\"op\":\"teleport\"}\n")?;
        stdin.write_all(b"not json\n")?;
    }
    drop(child.stdin.take());
    let output = child.wait_with_output()?;
    assert!(
        output.status.success(),
        "cangjing serve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    let responses: Vec<Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(responses.len(), 3);

    assert_eq!(responses[0].get("id").and_then(Value::as_u64), Some(1));
    assert_eq!(responses[0].get("ok").and_then(Value::as_bool), Some(true));
    assert_eq!(
        responses[0]
            .get("result")
            .and_then(|result| result.get("path"))
            .and_then(Value::as_str),
        Some("notes/alpha.md")
    );

    assert_eq!(responses[1].get("id").and_then(Value::as_str), Some("two"));
    assert_eq!(responses[1].get("ok").and_then(Value::as_bool), Some(false));
    assert_eq!(
        responses[1]
            .get("error")
            .and_then(|error| error.get("kind"))
            .and_then(Value::as_str),
        Some("invalid_input")
    );

    assert!(responses[2].get("id").is_none());
    assert_eq!(responses[2].get("ok").and_then(Value::as_bool), Some(false));
    Ok(())
}
