//! Vector-store and embedding seams.
//!
//! The pipeline depends on exactly three store operations (add, query, reset)
//! and on each result chunk carrying its source metadata. Production
//! backends (a persistent vector index, a hosted embedding service) implement
//! these traits outside the crate; [`memory::InMemoryVectorStore`] is the
//! bundled reference implementation.

mod memory;

pub use memory::InMemoryVectorStore;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::ingestion::chunk::Chunk;

/// A retrieval hit: a stored chunk plus its similarity to the query.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Similarity score; higher ranks first.
    pub score: f32,
}

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("vector store error: {0}")]
    #[diagnostic(code(policygraph::store::backend))]
    Backend(String),
}

/// Opaque nearest-neighbor store over embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds and stores the given chunks.
    async fn add(&self, chunks: Vec<Chunk>) -> Result<(), StoreError>;

    /// Returns the top-`k` chunks most similar to `text`, best first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Drops all stored vectors for the active collection. Destructive.
    async fn reset(&self) -> Result<(), StoreError>;
}

/// Text-to-vector encoder. Implementations must be deterministic for a given
/// input so tests can rank against fixed fakes.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
}
