use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use xiuxian_cangjing::search::ResultType;
use xiuxian_cangjing::semantic::{
    EmbeddingProvider, HashEmbeddingProvider, SemanticFilters, SemanticMode, SemanticQuery,
    load_vectors, save_vectors,
};
use xiuxian_cangjing::{Engine, EngineBuilder, EngineConfig, VaultError, VaultResult};

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn observatory_vault(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write_file(
        &root.join("one.md"),
        "# One\n\nThe observatory tracks comet orbits nightly.\n",
    )?;
    write_file(
        &root.join("two.md"),
        "# Two\n\nThe observatory tracks comet orbits weekly.\n",
    )?;
    write_file(&root.join("stub.md"), "# Stub\n\nshort\n")?;
    Ok(())
}

#[test]
fn test_cosine_breaks_lexical_ties() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut engine = Engine::open(EngineConfig::with_root(tmp.path()))?;

    let query_vector = HashEmbeddingProvider.embed("observatory")?;
    let opposite: Vec<f32> = query_vector.iter().map(|value| -value).collect();
    engine.embed_upsert("two", Some(query_vector))?;
    engine.embed_upsert("one", Some(opposite))?;

    let response = engine.semantic_query(&SemanticQuery::new("observatory"))?;
    assert_eq!(response.mode, SemanticMode::Semantic);
    assert_eq!(response.alpha, Some(0.5));
    assert_eq!(response.results.len(), 2);
    let top = &response.results[0];
    let runner_up = &response.results[1];
    assert_eq!(top.path, "two.md");
    assert_eq!(runner_up.path, "one.md");
    assert!((top.lexical - runner_up.lexical).abs() < 1e-9);
    assert!(top.cosine > 0.99);
    assert_eq!(top.result_type, ResultType::Semantic);
    Ok(())
}

#[test]
fn test_short_notes_and_filters_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    write_file(
        &tmp.path().join("archive/three.md"),
        "---\ntags: [space]\n---\n# Three\n\nAn old observatory logbook entry.\n",
    )?;
    let mut engine = Engine::open(EngineConfig::with_root(tmp.path()))?;

    let all = engine.semantic_query(&SemanticQuery::new("observatory logbook"))?;
    assert_eq!(all.scanned, 3);
    assert!(all.results.iter().all(|hit| hit.path != "stub.md"));

    let mut request = SemanticQuery::new("observatory");
    request.filters = SemanticFilters {
        path_prefix: Some("archive/".to_string()),
        tags: vec!["space".to_string()],
        doc_type: None,
    };
    let filtered = engine.semantic_query(&request)?;
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.results[0].path, "archive/three.md");

    let mut paged = SemanticQuery::new("observatory");
    paged.top_k = 1;
    paged.offset = 1;
    let second_page = engine.semantic_query(&paged)?;
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.results.len(), 1);
    Ok(())
}

#[test]
fn test_scan_budget_caps_notes_scored() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut config = EngineConfig::with_root(tmp.path());
    config.semantic.scan_budget = 1;
    let mut engine = Engine::open(config)?;

    let response = engine.semantic_query(&SemanticQuery::new("observatory"))?;
    assert_eq!(response.scanned, 1);
    assert_eq!(response.total, 1);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].path, "one.md");
    Ok(())
}

#[test]
fn test_disabled_layer_serves_lexical_fallback() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut config = EngineConfig::with_root(tmp.path());
    config.semantic.enabled = false;
    let mut engine = Engine::open(config)?;

    let response = engine.semantic_query(&SemanticQuery::new("observatory"))?;
    assert_eq!(response.mode, SemanticMode::Fallback);
    assert!(response.alpha.is_none());
    assert_eq!(response.results.len(), 2);
    assert!(response
        .results
        .iter()
        .all(|hit| hit.result_type == ResultType::Fallback && (hit.score - 1.0).abs() < 1e-9));
    assert!(engine.semantic().is_empty());
    Ok(())
}

#[test]
fn test_empty_query_and_bad_dimension_are_invalid() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut engine = Engine::open(EngineConfig::with_root(tmp.path()))?;

    assert!(matches!(
        engine.semantic_query(&SemanticQuery::new("  ")),
        Err(VaultError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.embed_upsert("one", Some(vec![1.0, 0.0])),
        Err(VaultError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.embed_upsert("nobody", None),
        Err(VaultError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_build_index_then_flush_persists_with_backup() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut engine = Engine::open(EngineConfig::with_root(tmp.path()))?;

    let report = engine.semantic_build_index(None)?;
    assert_eq!(report.generated, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.provider, "hash");
    assert!(engine.flush().embeddings_saved);

    let snapshot = tmp.path().join(".cangjing/embeddings.json");
    assert!(snapshot.is_file());
    assert_eq!(load_vectors(&snapshot).len(), 2);

    let again = engine.semantic_build_index(None)?;
    assert_eq!(again.generated, 0);
    assert_eq!(again.cached, 2);
    assert!(!engine.flush().embeddings_saved);

    engine.write("one.md", "# One\n\nThe observatory closed for repairs today.\n", false)?;
    assert_eq!(engine.semantic().len(), 1);
    assert!(engine.flush().embeddings_saved);
    assert!(tmp.path().join(".cangjing/embeddings.json.bak").is_file());

    drop(engine);
    let reopened = Engine::open(EngineConfig::with_root(tmp.path()))?;
    assert_eq!(reopened.semantic().len(), 1);
    assert!(reopened.semantic().vector("two.md").is_some());
    Ok(())
}

#[test]
fn test_corrupt_snapshot_falls_back_to_backup() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("embeddings.json");
    let mut table = BTreeMap::new();
    table.insert("a.md".to_string(), vec![1.0_f32, 0.0]);
    save_vectors(&path, &table, true)?;
    save_vectors(&path, &table, true)?;
    fs::write(&path, "{ not json")?;

    assert_eq!(load_vectors(&path), table);

    fs::write(tmp.path().join("embeddings.json.bak"), "also broken")?;
    assert!(load_vectors(&path).is_empty());
    Ok(())
}

#[derive(Debug)]
struct FixedProvider;

impl EmbeddingProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn embed(&self, _text: &str) -> VaultResult<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

#[test]
fn test_registered_provider_is_selected_by_name() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    observatory_vault(tmp.path())?;
    let mut config = EngineConfig::with_root(tmp.path());
    config.semantic.provider = "fixed".to_string();
    let engine = EngineBuilder::new(config.clone())
        .provider(
            "fixed",
            Box::new(|| Ok(Arc::new(FixedProvider) as Arc<dyn EmbeddingProvider>)),
        )
        .build()?;
    assert_eq!(engine.stats().provider, "fixed");

    config.semantic.provider = "missing".to_string();
    let fallback = Engine::open(config)?;
    assert_eq!(fallback.stats().provider, "hash");
    Ok(())
}
