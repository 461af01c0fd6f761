//! Embedding providers.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::error::VaultResult;

/// Dimension of the built-in hash embedding.
pub const HASH_EMBEDDING_DIMENSION: usize = 32;
/// Registry name of the built-in provider.
pub const HASH_PROVIDER_NAME: &str = "hash";

/// Text to fixed-length vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;
    /// Output length.
    fn dimension(&self) -> usize;
    /// Embed text into a unit vector.
    ///
    /// # Errors
    /// Returns [`crate::VaultError::Provider`] when the backend fails.
    fn embed(&self, text: &str) -> VaultResult<Vec<f32>>;
}

/// Deterministic character-bucket embedding covering Latin, digits and Cyrillic.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashEmbeddingProvider;

fn bucket_of(ch: char) -> Option<usize> {
    let code = ch as u32;
    let bucket = match ch {
        'a'..='z' => code - 'a' as u32,
        '0'..='9' => 26 + (code - '0' as u32) % 6,
        'ё' => 'е' as u32 - 'а' as u32,
        'а'..='я' => code - 'а' as u32,
        other if other.is_alphanumeric() => code,
        _ => return None,
    };
    usize::try_from(bucket).ok().map(|b| b % HASH_EMBEDDING_DIMENSION)
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &'static str {
        HASH_PROVIDER_NAME
    }

    fn dimension(&self) -> usize {
        HASH_EMBEDDING_DIMENSION
    }

    #[allow(clippy::cast_precision_loss)]
    fn embed(&self, text: &str) -> VaultResult<Vec<f32>> {
        let mut counts = [0u32; HASH_EMBEDDING_DIMENSION];
        for ch in text.chars().flat_map(char::to_lowercase) {
            if let Some(bucket) = bucket_of(ch) {
                counts[bucket] = counts[bucket].saturating_add(1);
            }
        }
        let mut vector: Vec<f32> = counts.iter().map(|count| *count as f32).collect();
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// Scale to unit length in place; zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity; mismatched or zero vectors score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Constructor for a named provider.
pub type ProviderFactory = Box<dyn Fn() -> VaultResult<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// Named provider factories; the hash provider is always available.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry").field("factories", &names).finish()
    }
}

impl ProviderRegistry {
    /// Register a factory under `name` (case-insensitive).
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(name.trim().to_lowercase(), factory);
    }

    /// Instantiate `name`, falling back to the hash provider on any failure.
    #[must_use]
    pub fn select(&self, name: &str) -> Arc<dyn EmbeddingProvider> {
        let key = name.trim().to_lowercase();
        if key.is_empty() || key == HASH_PROVIDER_NAME {
            return Arc::new(HashEmbeddingProvider);
        }
        let Some(factory) = self.factories.get(&key) else {
            warn!("embedding provider '{key}' is not registered; using hash provider");
            return Arc::new(HashEmbeddingProvider);
        };
        match factory() {
            Ok(provider) => provider,
            Err(err) => {
                warn!("embedding provider '{key}' failed to initialize ({err}); using hash provider");
                Arc::new(HashEmbeddingProvider)
            }
        }
    }
}
