//! Pipeline stage execution primitives.
//!
//! A [`Node`] is one executable stage of the answer pipeline. Nodes receive a
//! read-only [`StateSnapshot`](crate::state::StateSnapshot) plus a
//! [`NodeContext`], do their work against their injected collaborators, and
//! return a [`StatePatch`](crate::state::StatePatch) describing the state
//! fields they changed.
//!
//! # Error handling
//!
//! Returning `Err(NodeError)` is fatal for the current turn: the orchestrator
//! aborts without checkpointing, so the conversation state is never left with
//! a partial turn. Recoverable conditions (retrieval outage, tool lookup
//! failure) are degraded to informative text inside the node instead.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::state::{StatePatch, StateSnapshot};

/// One executable stage of the answer pipeline.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this stage against the given snapshot.
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext)
    -> Result<StatePatch, NodeError>;
}

/// Execution context passed to a node for one stage invocation.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identifier of the stage being executed (e.g. `"retrieve"`).
    pub node_id: String,
    /// Monotonic step number within the conversation thread.
    pub step: u64,
}

impl NodeContext {
    #[must_use]
    pub fn new(node_id: impl Into<String>, step: u64) -> Self {
        Self {
            node_id: node_id.into(),
            step,
        }
    }

    /// Emit a node-scoped progress event into the trace stream.
    pub fn emit(&self, scope: &str, message: impl AsRef<str>) {
        tracing::debug!(
            node = %self.node_id,
            step = self.step,
            scope,
            "{}",
            message.as_ref()
        );
    }
}

/// Fatal errors that abort the current turn.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(policygraph::node::missing_input),
        help("Check that an earlier stage (or the caller) produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// An opaque collaborator (chat model, embedding backend) failed in a way
    /// the stage cannot degrade gracefully.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(policygraph::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(policygraph::node::serde_json))]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConversationState, StatePatch};

    struct EchoNode;

    #[async_trait]
    impl Node for EchoNode {
        async fn run(
            &self,
            snapshot: StateSnapshot,
            ctx: NodeContext,
        ) -> Result<StatePatch, NodeError> {
            ctx.emit("echo", "running");
            let question = snapshot
                .latest_user_message()
                .ok_or(NodeError::MissingInput {
                    what: "user message",
                })?;
            Ok(StatePatch::new().with_context(format!("echo: {question}")))
        }
    }

    #[tokio::test]
    async fn node_reads_snapshot_and_patches_state() {
        let mut state = ConversationState::new_with_user_message("ping");
        let patch = EchoNode
            .run(state.snapshot(), NodeContext::new("echo", 1))
            .await
            .unwrap();
        state.apply(patch);
        assert_eq!(state.context, "echo: ping");
    }

    #[tokio::test]
    async fn missing_user_message_is_fatal() {
        let state = ConversationState::default();
        let err = EchoNode
            .run(state.snapshot(), NodeContext::new("echo", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::MissingInput { .. }));
    }
}
