//! Revision-keyed FIFO cache for graph and tree operations.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

/// Default capacity.
pub const DEFAULT_HEAVY_CACHE_SIZE: usize = 50;

/// (operation, canonical arguments, revision).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeavyKey {
    /// Operation name.
    pub operation: String,
    /// Arguments serialized with sorted object keys.
    pub arguments: String,
    /// Store revision at computation time.
    pub revision: u64,
}

fn canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    canonical(inner, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Serialize JSON with object keys sorted at every level.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    canonical(value, &mut out);
    out
}

impl HeavyKey {
    /// Build a key; argument key order does not matter.
    pub fn new(operation: impl Into<String>, arguments: &Value, revision: u64) -> Self {
        Self {
            operation: operation.into(),
            arguments: canonical_json(arguments),
            revision,
        }
    }
}

/// Oldest-inserted-first eviction; no TTL since keys embed the revision.
#[derive(Debug)]
pub struct HeavyCache {
    entries: HashMap<HeavyKey, Value>,
    order: VecDeque<HeavyKey>,
    max_entries: usize,
}

impl HeavyCache {
    /// Create a cache; capacity is at least one.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Cached value.
    #[must_use]
    pub fn get(&self, key: &HeavyKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert, evicting the oldest entries past capacity.
    pub fn insert(&mut self, key: HeavyKey, value: Value) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
