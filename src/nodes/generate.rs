//! Generation stage: draft the grounded answer for the latest question.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::providers::ChatModel;
use crate::state::{StatePatch, StateSnapshot};

use super::retrieve::{NO_CHUNKS_SENTINEL, RETRIEVAL_FAILED_SENTINEL};

/// Disclosure appended when neither retrieval nor metadata grounded the answer.
pub const NO_GROUNDING_NOTE: &str = "Note: no supporting policy documents or metadata were \
found for this question, so the answer above is not grounded in the policy corpus.";

/// Composes the grounded prompt and appends the model's answer to the
/// conversation. A model failure here aborts the turn; nothing is persisted.
pub struct GenerateNode {
    model: Arc<dyn ChatModel>,
}

impl GenerateNode {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for GenerateNode {
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

        let system = compose_system_prompt(&snapshot.context, &snapshot.metadata_text);
        let completion = self
            .model
            .complete(&system, &[Message::user(question)])
            .await
            .map_err(|err| NodeError::Provider {
                provider: "generate",
                message: err.to_string(),
            })?;

        let mut answer = completion.content;
        if !is_grounded(&snapshot.context, &snapshot.metadata_text) {
            ctx.emit("generate", "answer is ungrounded; appending disclosure");
            answer = format!("{answer}\n\n{NO_GROUNDING_NOTE}");
        }

        Ok(StatePatch::new().with_messages(vec![Message::assistant(answer)]))
    }
}

/// Builds the answering instructions from retrieved snippets and, when
/// present, the metadata block. Metadata outranks snippets for status,
/// ownership, and review-cadence facts.
fn compose_system_prompt(context: &str, metadata_text: &str) -> String {
    let mut prompt = String::from(
        "You are a policy assistant. Answer the user's question using only the material below. \
If the material does not cover the question, say so plainly instead of guessing.\n\n\
[Retrieved Snippets]\n",
    );
    if context.is_empty() {
        prompt.push_str("(none)");
    } else {
        prompt.push_str(context);
    }
    if !metadata_text.is_empty() {
        prompt.push_str("\n\n[Metadata]\n");
        prompt.push_str(metadata_text);
        prompt.push_str(
            "\n\nWhen the metadata block conflicts with the snippets about publication status, \
business owner, managers, or review cadence, trust the metadata block.",
        );
    }
    prompt
}

/// True when the turn has at least one real grounding source: non-sentinel
/// retrieved context, or actual metadata from a tool call. The degraded
/// "metadata unavailable" placeholders are sentinels, not grounding.
fn is_grounded(context: &str, metadata_text: &str) -> bool {
    let context_grounded =
        !context.is_empty() && context != NO_CHUNKS_SENTINEL && context != RETRIEVAL_FAILED_SENTINEL;
    let metadata_grounded = !metadata_text.is_empty()
        && metadata_text != super::agent::METADATA_DEGRADED_TEXT
        && metadata_text != crate::tools::metadata::METADATA_UNAVAILABLE;
    context_grounded || metadata_grounded
}
