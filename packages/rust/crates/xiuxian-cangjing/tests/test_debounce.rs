use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use xiuxian_cangjing::note::IndexOutcome;
use xiuxian_cangjing::{
    DebounceScheduler, Engine, EngineBuilder, EngineConfig, ManualClock, SharedClock,
};

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn engine_with_clock(root: &Path) -> Result<(Engine, Arc<ManualClock>), Box<dyn std::error::Error>> {
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();
    let engine = EngineBuilder::new(EngineConfig::with_root(root))
        .clock(shared)
        .build()?;
    Ok((engine, clock))
}

#[test]
fn test_scheduler_rearms_and_reports_due_keys_in_order() {
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();
    let mut scheduler: DebounceScheduler<&str> =
        DebounceScheduler::new(Duration::from_millis(500), shared);

    assert!(!scheduler.schedule("a"));
    clock.advance(Duration::from_millis(100));
    assert!(!scheduler.schedule("b"));
    clock.advance(Duration::from_millis(300));
    assert!(scheduler.schedule("a"));

    clock.advance(Duration::from_millis(200));
    assert_eq!(scheduler.take_due(), vec!["b"]);
    assert!(scheduler.is_pending(&"a"));
    clock.advance(Duration::from_millis(300));
    assert_eq!(scheduler.take_due(), vec!["a"]);
    assert!(scheduler.is_empty());
}

#[test]
fn test_burst_of_notifications_reindexes_once() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("draft.md"), "# Draft\n\nFirst words.\n")?;
    let (mut engine, clock) = engine_with_clock(tmp.path())?;
    let revision = engine.revision();

    write_file(&tmp.path().join("draft.md"), "# Draft\n\nSecond words about lanterns.\n")?;
    assert!(!engine.notify_changed("draft.md")?);
    clock.advance(Duration::from_millis(200));
    assert!(engine.notify_changed("draft.md")?);
    clock.advance(Duration::from_millis(200));
    assert!(engine.notify_changed("draft.md")?);
    assert_eq!(engine.pending_reindex(), 1);

    clock.advance(Duration::from_millis(499));
    assert!(engine.tick().reindexed.is_empty());
    assert_eq!(engine.revision(), revision);

    clock.advance(Duration::from_millis(1));
    let report = engine.tick();
    assert_eq!(report.reindexed, vec!["draft.md".to_string()]);
    assert_eq!(engine.revision(), revision + 1);
    assert_eq!(engine.pending_reindex(), 0);
    assert!(engine.tick().is_idle());

    let hits = engine.search("lanterns", None, None)?;
    assert_eq!(hits.results.len(), 1);
    Ok(())
}

#[test]
fn test_unchanged_file_is_reported_not_reindexed() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("steady.md"), "# Steady\n")?;
    let (mut engine, clock) = engine_with_clock(tmp.path())?;
    let revision = engine.revision();

    engine.notify_changed("steady.md")?;
    clock.advance(Duration::from_millis(500));
    let report = engine.tick();
    assert!(report.reindexed.is_empty());
    assert_eq!(report.unchanged, vec!["steady.md".to_string()]);
    assert_eq!(engine.revision(), revision);
    Ok(())
}

#[test]
fn test_flush_runs_pending_work_immediately() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let (mut engine, _clock) = engine_with_clock(tmp.path())?;

    write_file(&tmp.path().join("new.md"), "# New\n")?;
    engine.notify_changed("new.md")?;
    let report = engine.flush();
    assert_eq!(report.reindexed, vec!["new.md".to_string()]);
    assert!(engine.store().get("new.md").is_some());
    Ok(())
}

#[test]
fn test_write_through_cancels_pending_timer() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("note.md"), "# Note\n")?;
    let (mut engine, _clock) = engine_with_clock(tmp.path())?;

    engine.notify_changed("note.md")?;
    engine.write("note.md", "# Note\n\nEdited in place.\n", false)?;
    assert_eq!(engine.pending_reindex(), 0);
    Ok(())
}

#[test]
fn test_notify_rejects_paths_outside_root() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let (mut engine, _clock) = engine_with_clock(tmp.path())?;
    assert!(engine.notify_changed("../elsewhere.md").is_err());
    assert_eq!(engine.pending_reindex(), 0);
    Ok(())
}

#[test]
fn test_case_variant_paths_share_one_record() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("alpha.md"), "# Alpha\n\nSteady text.\n")?;
    let (mut engine, _clock) = engine_with_clock(tmp.path())?;
    let revision = engine.revision();

    assert_eq!(engine.reindex_one("ALPHA.md")?, IndexOutcome::Unchanged);
    assert!(engine.store().get("alpha.md").is_some());
    assert_eq!(engine.revision(), revision);

    assert!(!engine.notify_changed("Alpha.md")?);
    assert!(engine.notify_changed("alpha.md")?);
    assert_eq!(engine.pending_reindex(), 1);
    let report = engine.flush();
    assert_eq!(report.unchanged, vec!["alpha.md".to_string()]);
    assert!(report.reindexed.is_empty());
    assert_eq!(engine.store().len(), 1);
    assert!(engine.store().get("alpha.md").is_some());
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_case_only_rename_on_disk_follows_new_spelling() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("alpha.md"), "# Alpha\n")?;
    let (mut engine, _clock) = engine_with_clock(tmp.path())?;

    fs::rename(tmp.path().join("alpha.md"), tmp.path().join("Alpha.md"))?;
    assert_eq!(engine.reindex_one("Alpha.md")?, IndexOutcome::Updated);
    assert_eq!(engine.store().len(), 1);
    assert_eq!(
        engine.store().get("Alpha.md").map(|doc| doc.path.clone()),
        Some("Alpha.md".to_string())
    );
    Ok(())
}
