use std::fs;
use std::path::Path;

use tempfile::TempDir;
use xiuxian_cangjing::search::{Category, ResultType};
use xiuxian_cangjing::{Engine, EngineConfig, RankingProfile, VaultError};

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn open_engine(root: &Path) -> Result<Engine, Box<dyn std::error::Error>> {
    Ok(Engine::open(EngineConfig::with_root(root))?)
}

#[test]
fn test_search_exact_and_typo_matches() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("deploy.md"),
        "# Deploy\n\nRolling kubernetes upgrades without downtime.\n",
    )?;
    write_file(&tmp.path().join("garden.md"), "# Garden\n\nTomatoes and basil.\n")?;
    let mut engine = open_engine(tmp.path())?;

    let exact = engine.search("kubernetes", None, None)?;
    assert_eq!(exact.results.len(), 1);
    assert_eq!(exact.results[0].path, "deploy.md");
    assert!(exact.results[0].score.abs() < f64::EPSILON);
    assert_eq!(exact.results[0].result_type, ResultType::Base);

    let typo = engine.search("kubernets", None, None)?;
    assert_eq!(typo.results.len(), 1);
    assert_eq!(typo.results[0].path, "deploy.md");
    let score = typo.results[0].score;
    assert!(score < 0.35, "typo score {score}");

    let miss = engine.search("zzqqxxyy", None, None)?;
    assert!(miss.results.is_empty());
    assert_eq!(miss.total_candidates, 0);
    Ok(())
}

#[test]
fn test_partial_matches_fall_below_threshold() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("deploy.md"),
        "# Deploy\n\nRolling kubernetes upgrades without downtime.\n",
    )?;
    write_file(&tmp.path().join("garden.md"), "# Garden\n\nTomatoes and basil.\n")?;
    write_file(
        &tmp.path().join("both.md"),
        "# Both\n\nKubernetes pods beside the tomatoes.\n",
    )?;
    let mut engine = open_engine(tmp.path())?;

    let strict = engine.search("kubernetes tomatoes", None, None)?;
    let paths: Vec<&str> = strict.results.iter().map(|hit| hit.path.as_str()).collect();
    assert_eq!(paths, vec!["both.md"]);
    assert_eq!(strict.total_candidates, 1);

    let mut config = EngineConfig::with_root(tmp.path());
    config.fuzzy_threshold = 0.6;
    let mut lenient = Engine::open(config)?;
    let relaxed = lenient.search("kubernetes tomatoes", None, None)?;
    assert_eq!(relaxed.results.len(), 3);
    assert_eq!(relaxed.results[0].path, "both.md");
    Ok(())
}

#[test]
fn test_search_highlights_and_prefixes_category() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("notes/comet.md"),
        "# Comet Survey\n\nThe comet survey ran all night.\n",
    )?;
    let mut engine = open_engine(tmp.path())?;

    let response = engine.search("comet", None, None)?;
    let hit = response.results.first().ok_or("expected a hit")?;
    assert_eq!(hit.title, "**Comet** Survey");
    assert!(hit.description.starts_with("[Other] "));
    assert!(hit.snippet.contains("**comet**"));
    Ok(())
}

#[test]
fn test_filter_only_query_scans_whole_corpus() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("a.md"),
        "---\ntags: [rust]\n---\n# Borrow checker\n",
    )?;
    write_file(&tmp.path().join("b.md"), "# Lifetimes\n\nNotes #rust/async\n")?;
    write_file(&tmp.path().join("c.md"), "---\ntags: [python]\n---\n# Decorators\n")?;
    let mut engine = open_engine(tmp.path())?;

    let response = engine.search("tag:rust", None, None)?;
    assert_eq!(response.total_candidates, 3);
    let mut paths: Vec<&str> = response.results.iter().map(|hit| hit.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["a.md", "b.md"]);

    let excluded = engine.search("tag:rust -lifetimes", None, None)?;
    assert_eq!(excluded.results.len(), 1);
    assert_eq!(excluded.results[0].path, "a.md");

    assert!(matches!(
        engine.search("   ", None, None),
        Err(VaultError::InvalidInput(_))
    ));
    Ok(())
}

#[test]
fn test_strong_results_pull_in_linked_neighbors() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("deploy.md"),
        "# Deploy\n\nKubernetes rollout steps, see [[cluster]].\n",
    )?;
    write_file(&tmp.path().join("cluster.md"), "# Cluster\n\nNode pools and networking.\n")?;
    let mut engine = open_engine(tmp.path())?;

    let response = engine.search("kubernetes", None, None)?;
    assert_eq!(response.results.len(), 2);
    let linked = response
        .results
        .iter()
        .find(|hit| hit.result_type == ResultType::Linked)
        .ok_or("expected a linked row")?;
    assert_eq!(linked.path, "cluster.md");
    assert_eq!(linked.linked_from.as_deref(), Some("deploy.md"));
    Ok(())
}

#[test]
fn test_results_grouped_by_category_priority() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("zeta.md"), "# Zeta\n\nRetention retention.\n")?;
    write_file(
        &tmp.path().join("specs/storage.md"),
        "# Storage\n\nRetention policy.\n",
    )?;
    let mut engine = open_engine(tmp.path())?;

    let response = engine.search("retention", None, Some(RankingProfile::Balanced))?;
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].path, "specs/storage.md");
    assert_eq!(response.results[0].category, Category::Specification);
    assert_eq!(response.results[1].category, Category::Other);
    Ok(())
}

#[test]
fn test_limit_caps_base_results() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    for idx in 0..5 {
        write_file(
            &tmp.path().join(format!("note-{idx}.md")),
            &format!("# Note {idx}\n\nShared keyword orchard.\n"),
        )?;
    }
    let mut engine = open_engine(tmp.path())?;

    let response = engine.search("orchard", Some(3), None)?;
    assert_eq!(response.limit, 3);
    assert_eq!(response.total_candidates, 5);
    assert_eq!(response.results.len(), 3);
    Ok(())
}
