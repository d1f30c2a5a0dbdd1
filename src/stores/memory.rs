//! In-memory reference vector store with cosine ranking.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Embedder, ScoredChunk, StoreError, VectorStore};
use crate::ingestion::chunk::Chunk;
use async_trait::async_trait;

/// Volatile vector store backed by a plain vector of embedded chunks.
///
/// Suitable for tests, demos, and small corpora; durable backends implement
/// [`VectorStore`] outside the crate.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<(Chunk, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        let embedded: Vec<(Chunk, Vec<f32>)> = chunks
            .into_iter()
            .map(|chunk| {
                let vector = self.embedder.embed(&chunk.text);
                (chunk, vector)
            })
            .collect();
        self.entries.write().extend(embedded);
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let query_vector = self.embedder.embed(text);
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .read()
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_vector, vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::chunk::ChunkMetadata;

    /// Maps each known keyword to its own axis so similarity is transparent.
    struct KeywordEmbedder(Vec<&'static str>);

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            self.0
                .iter()
                .map(|kw| lower.matches(kw).count() as f32)
                .collect()
        }
    }

    fn chunk(text: &str, source: &str) -> Chunk {
        Chunk::new(
            text,
            ChunkMetadata {
                source: source.to_string(),
                title: source.trim_end_matches(".txt").to_string(),
                ..Default::default()
            },
        )
    }

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(KeywordEmbedder(vec![
            "privacy", "expense", "security",
        ])))
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let store = store();
        store
            .add(vec![
                chunk("privacy privacy privacy", "privacy.txt"),
                chunk("expense reports", "expense.txt"),
            ])
            .await
            .unwrap();

        let hits = store.query("privacy question", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.metadata.source, "privacy.txt");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn query_truncates_to_k() {
        let store = store();
        store
            .add(vec![
                chunk("security a", "a.txt"),
                chunk("security b", "b.txt"),
                chunk("security c", "c.txt"),
            ])
            .await
            .unwrap();
        assert_eq!(store.query("security", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_store_returns_no_hits() {
        let store = store();
        assert!(store.query("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_drops_everything() {
        let store = store();
        store.add(vec![chunk("privacy", "p.txt")]).await.unwrap();
        assert_eq!(store.len(), 1);
        store.reset().await.unwrap();
        assert!(store.is_empty());
        assert!(store.query("privacy", 1).await.unwrap().is_empty());
    }

    #[test]
    fn cosine_handles_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
