//! Retrieval stage: fetch supporting snippets for the latest user question.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError};
use crate::state::{StatePatch, StateSnapshot};
use crate::stores::{ScoredChunk, VectorStore};

/// Context sentinel written when the store returned no neighbors.
pub const NO_CHUNKS_SENTINEL: &str = "No relevant chunks were found.";

/// Context sentinel written when the store query itself failed. Retrieval
/// failure degrades the turn instead of aborting it.
pub const RETRIEVAL_FAILED_SENTINEL: &str =
    "Retrieval failed; no supporting snippets are available.";

/// Queries the vector store with the latest user question and rewrites the
/// shared context with the formatted results (or a sentinel).
pub struct RetrieveNode {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RetrieveNode {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }
}

#[async_trait]
impl Node for RetrieveNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<StatePatch, NodeError> {
        let question = snapshot
            .latest_user_message()
            .ok_or(NodeError::MissingInput {
                what: "latest user message",
            })?;

        let context = match self.store.query(question, self.top_k).await {
            Ok(hits) if hits.is_empty() => {
                ctx.emit("retrieve", "no chunks matched the question");
                NO_CHUNKS_SENTINEL.to_string()
            }
            Ok(hits) => {
                ctx.emit("retrieve", format!("{} chunk(s) retrieved", hits.len()));
                format_snippets(&hits)
            }
            Err(err) => {
                tracing::warn!(error = %err, "vector store query failed; continuing without snippets");
                RETRIEVAL_FAILED_SENTINEL.to_string()
            }
        };

        Ok(StatePatch::new().with_context(context))
    }
}

/// Formats retrieved chunks as source-attributed lines, best match first.
/// Internal newlines are flattened so each snippet stays one logical line.
fn format_snippets(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| {
            let flat = hit.chunk.text.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("[Source: {}] {}", hit.chunk.metadata.source, flat)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
