use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use xiuxian_cangjing::cache::{HeavyCache, HeavyKey, SearchCache};
use xiuxian_cangjing::graph::NeighborhoodRequest;
use xiuxian_cangjing::{EngineBuilder, EngineConfig, ManualClock, SharedClock};

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn manual_clock() -> (Arc<ManualClock>, SharedClock) {
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();
    (clock, shared)
}

#[test]
fn test_search_cache_evicts_least_hit_entry() {
    let (_, shared) = manual_clock();
    let mut cache: SearchCache<u32> = SearchCache::new(2, Duration::from_secs(300), shared);

    cache.insert("popular".to_string(), 1);
    cache.insert("cold".to_string(), 2);
    assert_eq!(cache.get("popular"), Some(1));
    assert_eq!(cache.get("popular"), Some(1));
    assert_eq!(cache.hits("popular"), Some(2));

    cache.insert("fresh".to_string(), 3);
    assert_eq!(cache.len(), 2);
    assert!(cache.contains("popular"));
    assert!(cache.contains("fresh"));
    assert!(!cache.contains("cold"));
}

#[test]
fn test_search_cache_ttl_follows_last_touch() {
    let (clock, shared) = manual_clock();
    let mut cache: SearchCache<&str> = SearchCache::new(10, Duration::from_secs(300), shared);

    cache.insert("query".to_string(), "hit");
    clock.advance(Duration::from_secs(200));
    assert_eq!(cache.get("query"), Some("hit"));
    clock.advance(Duration::from_secs(200));
    assert_eq!(cache.get("query"), Some("hit"));

    clock.advance(Duration::from_secs(301));
    assert_eq!(cache.get("query"), None);
    assert!(cache.is_empty());
}

#[test]
fn test_heavy_cache_drops_oldest_insert() {
    let mut cache = HeavyCache::new(2);
    let first = HeavyKey::new("neighborhood", &json!({"note": "a", "depth": 1}), 1);
    let second = HeavyKey::new("neighborhood", &json!({"note": "b"}), 1);
    let third = HeavyKey::new("shortest-path", &json!({"from": "a", "to": "b"}), 1);

    cache.insert(first.clone(), json!(1));
    cache.insert(second.clone(), json!(2));
    assert!(cache.get(&first).is_some());
    cache.insert(third.clone(), json!(3));

    assert_eq!(cache.len(), 2);
    assert!(cache.get(&first).is_none());
    assert_eq!(cache.get(&second), Some(&json!(2)));
    assert_eq!(cache.get(&third), Some(&json!(3)));
}

#[test]
fn test_heavy_key_ignores_argument_order_but_not_revision() {
    let left = HeavyKey::new("op", &json!({"a": 1, "b": [1, 2]}), 4);
    let right = HeavyKey::new("op", &json!({"b": [1, 2], "a": 1}), 4);
    let later = HeavyKey::new("op", &json!({"a": 1, "b": [1, 2]}), 5);
    assert_eq!(left, right);
    assert_ne!(left, later);
}

#[test]
fn test_engine_caches_clear_on_revision_change() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("alpha.md"), "# Alpha\n\nOrbit notes, see [[beta]].\n")?;
    write_file(&tmp.path().join("beta.md"), "# Beta\n\nMore orbit notes.\n")?;
    let (_, shared) = manual_clock();
    let mut engine = EngineBuilder::new(EngineConfig::with_root(tmp.path()))
        .clock(shared)
        .build()?;

    engine.search("orbit", None, None)?;
    engine.search("  ORBIT ", None, None)?;
    engine.neighborhood(&NeighborhoodRequest::new("alpha"))?;
    let warm = engine.cache_stats();
    assert_eq!(warm.search_entries, 1);
    assert_eq!(warm.heavy_entries, 1);

    engine.write("gamma.md", "# Gamma\n\nOrbit too.\n", false)?;
    let cold = engine.cache_stats();
    assert_eq!(cold.search_entries, 0);
    assert_eq!(cold.heavy_entries, 0);

    let refreshed = engine.search("orbit", None, None)?;
    assert!(refreshed.results.iter().any(|hit| hit.path == "gamma.md"));
    Ok(())
}

#[test]
fn test_engine_search_cache_expires_with_clock() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("alpha.md"), "# Alpha\n\nOrbit notes.\n")?;
    let (clock, shared) = manual_clock();
    let mut engine = EngineBuilder::new(EngineConfig::with_root(tmp.path()))
        .clock(shared)
        .build()?;

    engine.search("orbit", None, None)?;
    assert_eq!(engine.cache_stats().search_entries, 1);
    clock.advance(Duration::from_secs(301));
    engine.search("alpha", None, None)?;
    assert_eq!(engine.cache_stats().search_entries, 1);
    Ok(())
}
