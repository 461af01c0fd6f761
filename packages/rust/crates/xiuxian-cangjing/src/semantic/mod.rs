//! Embedding store with hybrid lexical and cosine scoring.

mod persistence;
mod provider;
mod store;

pub use persistence::{VectorTable, load_vectors, save_vectors};
pub use provider::{
    EmbeddingProvider, HASH_EMBEDDING_DIMENSION, HASH_PROVIDER_NAME, HashEmbeddingProvider,
    ProviderFactory, ProviderRegistry, cosine_similarity, l2_normalize,
};
pub use store::{
    BuildIndexReport, SemanticFilters, SemanticHit, SemanticMode, SemanticQuery, SemanticResponse,
    SemanticStore, lexical_relevance, significant_words,
};
