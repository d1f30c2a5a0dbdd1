//! Agent stage: decide whether the turn needs structured policy metadata.
//!
//! The chat model sees the conversation plus tool descriptions and either
//! answers "no tool" or requests one call. Tool failures degrade to a fixed
//! placeholder text so the generation stage can still complete the turn; only
//! a model failure aborts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::providers::ChatModel;
use crate::state::{StatePatch, StateSnapshot};
use crate::tools::ToolRegistry;

/// Metadata text written when the requested tool is unknown or failed.
pub const METADATA_DEGRADED_TEXT: &str = "Policy metadata is unavailable at this time.";

const AGENT_SYSTEM_PROMPT: &str = "You are a routing assistant for a policy question-answering \
service. Decide whether answering the user's latest question requires structured policy metadata \
(publication status, business owner, managers, review cadence). If it does, call the appropriate \
tool with the policy name or person mentioned in the question. Otherwise respond without calling \
any tool. Use the conversation history for follow-up questions and never fabricate metadata.";

/// Runs the tool-routing model and, when a tool fires, records its output as
/// the turn's metadata text.
pub struct AgentNode {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
}

impl AgentNode {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self { model, tools }
    }

    fn system_prompt(&self, context: &str) -> String {
        let mut prompt = format!("{AGENT_SYSTEM_PROMPT}\n\nAvailable tools:\n{}", self.tools.describe());
        if !context.is_empty() {
            prompt.push_str("\n\nRetrieved context for the current question:\n");
            prompt.push_str(context);
        }
        prompt
    }
}

#[async_trait]
impl Node for AgentNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<StatePatch, NodeError> {
        let completion = self
            .model
            .complete(&self.system_prompt(&snapshot.context), &snapshot.messages)
            .await
            .map_err(|err| NodeError::Provider {
                provider: "agent",
                message: err.to_string(),
            })?;

        let Some(call) = completion.tool_call else {
            ctx.emit("agent", "no tool requested");
            return Ok(StatePatch::new());
        };

        ctx.emit("agent", format!("tool requested: {}", call.name));
        let metadata_text = match self.tools.get(&call.name) {
            Some(tool) => match tool.call(&call.arguments).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(tool = %call.name, error = %err, "tool call failed");
                    METADATA_DEGRADED_TEXT.to_string()
                }
            },
            None => {
                tracing::warn!(tool = %call.name, "model requested unknown tool");
                METADATA_DEGRADED_TEXT.to_string()
            }
        };

        let mut appended = Vec::new();
        if !completion.content.trim().is_empty() {
            appended.push(Message::assistant(completion.content));
        }
        appended.push(Message::tool(metadata_text.clone()));

        Ok(StatePatch::new()
            .with_messages(appended)
            .with_metadata_text(metadata_text)
            .with_tool_called(true))
    }
}
