//! Durable conversation state keyed by thread id.
//!
//! A checkpoint is written once per completed turn; loading the latest
//! checkpoint for a thread resumes the conversation with full message
//! history, retrieved context, and tool bookkeeping intact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::ConversationState;

/// Stable identifier for one conversation thread.
pub type ThreadId = String;

/// A snapshot of conversation state persisted at the end of a turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: ThreadId,
    /// Number of node executions completed across the thread's lifetime.
    pub step: u64,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(thread_id: impl Into<ThreadId>, step: u64, state: ConversationState) -> Self {
        Self {
            thread_id: thread_id.into(),
            step,
            state,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint backend failure: {0}")]
    #[diagnostic(
        code(policygraph::checkpointer::backend),
        help("the checkpoint store rejected the operation; the turn result was still returned to the caller")
    )]
    Backend(String),
}

/// Persistence seam for conversation checkpoints.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Stores `checkpoint` as the latest for its thread.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Returns the most recent checkpoint for `thread_id`, if any.
    async fn load_latest(
        &self,
        thread_id: &str,
    ) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Lists every thread id with at least one checkpoint, sorted.
    async fn list_threads(&self) -> Result<Vec<ThreadId>, CheckpointerError>;
}

/// Process-local checkpointer. Each thread keeps only its latest checkpoint.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    inner: RwLock<FxHashMap<ThreadId, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.inner
            .write()
            .insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(
        &self,
        thread_id: &str,
    ) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self.inner.read().get(thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, CheckpointerError> {
        let mut ids: Vec<ThreadId> = self.inner.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn state_with(text: &str) -> ConversationState {
        ConversationState::new_with_user_message(text)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let cp = InMemoryCheckpointer::new();
        cp.save(Checkpoint::new("thread-1", 3, state_with("hello")))
            .await
            .unwrap();

        let loaded = cp.load_latest("thread-1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 3);
        assert_eq!(loaded.state.latest_user_message(), Some("hello"));
    }

    #[tokio::test]
    async fn latest_save_wins() {
        let cp = InMemoryCheckpointer::new();
        cp.save(Checkpoint::new("t", 1, state_with("first")))
            .await
            .unwrap();
        let mut newer = state_with("first");
        newer.push(Message::assistant("answer"));
        cp.save(Checkpoint::new("t", 4, newer)).await.unwrap();

        let loaded = cp.load_latest("t").await.unwrap().unwrap();
        assert_eq!(loaded.step, 4);
        assert_eq!(loaded.state.latest_assistant_message(), Some("answer"));
    }

    #[tokio::test]
    async fn unknown_thread_is_none() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.load_latest("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_threads_is_sorted() {
        let cp = InMemoryCheckpointer::new();
        cp.save(Checkpoint::new("beta", 1, state_with("b")))
            .await
            .unwrap();
        cp.save(Checkpoint::new("alpha", 1, state_with("a")))
            .await
            .unwrap();
        assert_eq!(cp.list_threads().await.unwrap(), vec!["alpha", "beta"]);
    }
}
