//! Conversation state threaded through the orchestration pipeline.
//!
//! One [`ConversationState`] exists per active conversation thread. Each turn
//! the orchestrator takes an immutable [`StateSnapshot`] for every stage and
//! merges the [`StatePatch`] the stage returns. The state is a plain tagged
//! record with typed fields rather than an ambient keyed map, so every stage's
//! reads and writes are visible in its signature.
//!
//! # Field semantics
//!
//! - `messages`: ordered role-tagged history, append-only within a turn.
//! - `context`: the latest retrieved-snippet block; overwritten by each
//!   retrieve stage, never accumulated.
//! - `metadata_text`: the last tool output. Carried forward across turns when
//!   no tool fires, so the generate stage can still fall back on it.
//! - `tool_called`: monotonic flag; flips true the first time any tool fires
//!   in the conversation and never flips back.

use serde::{Deserialize, Serialize};

use crate::message::{self, Message, Role};

/// Accumulated state for one conversation thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Ordered conversation history (user/assistant/tool turns).
    pub messages: Vec<Message>,
    /// Latest retrieved-snippet block, overwritten each retrieve stage.
    pub context: String,
    /// Last tool output; empty until a tool has fired.
    pub metadata_text: String,
    /// True once any tool has fired in this conversation.
    pub tool_called: bool,
}

impl ConversationState {
    /// Creates a state seeded with a single user message.
    #[must_use]
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self {
            messages: vec![Message::user(user_text)],
            ..Default::default()
        }
    }

    /// Appends a message to the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Content of the most recent user message, if any.
    #[must_use]
    pub fn latest_user_message(&self) -> Option<&str> {
        message::latest_with_role(&self.messages, Role::User)
    }

    /// Content of the most recent assistant message, if any.
    #[must_use]
    pub fn latest_assistant_message(&self) -> Option<&str> {
        message::latest_with_role(&self.messages, Role::Assistant)
    }

    /// Takes an immutable point-in-time view for a stage to read.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.clone(),
            context: self.context.clone(),
            metadata_text: self.metadata_text.clone(),
            tool_called: self.tool_called,
        }
    }

    /// Merges a stage's partial update into this state.
    ///
    /// Messages append; `context` and `metadata_text` overwrite; `tool_called`
    /// is monotonic (once true it cannot be cleared by later patches).
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(messages) = patch.messages {
            self.messages.extend(messages);
        }
        if let Some(context) = patch.context {
            self.context = context;
        }
        if let Some(metadata_text) = patch.metadata_text {
            self.metadata_text = metadata_text;
        }
        if let Some(tool_called) = patch.tool_called {
            self.tool_called = self.tool_called || tool_called;
        }
    }
}

/// Read-only view of [`ConversationState`] handed to pipeline stages.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Messages at the time of the snapshot.
    pub messages: Vec<Message>,
    /// Retrieved-snippet block at the time of the snapshot.
    pub context: String,
    /// Last tool output at the time of the snapshot.
    pub metadata_text: String,
    /// Whether any tool has fired so far in the conversation.
    pub tool_called: bool,
}

impl StateSnapshot {
    /// Content of the most recent user message, if any.
    #[must_use]
    pub fn latest_user_message(&self) -> Option<&str> {
        message::latest_with_role(&self.messages, Role::User)
    }
}

/// Partial state update returned by a pipeline stage.
///
/// All fields are optional; a stage only names the fields it changes.
#[derive(Clone, Debug, Default)]
pub struct StatePatch {
    /// Messages to append to the history.
    pub messages: Option<Vec<Message>>,
    /// Replacement for the retrieved-snippet block.
    pub context: Option<String>,
    /// Replacement for the last tool output.
    pub metadata_text: Option<String>,
    /// Tool-fired signal; merged monotonically.
    pub tool_called: Option<bool>,
}

impl StatePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_metadata_text(mut self, metadata_text: impl Into<String>) -> Self {
        self.metadata_text = Some(metadata_text.into());
        self
    }

    #[must_use]
    pub fn with_tool_called(mut self, tool_called: bool) -> Self {
        self.tool_called = Some(tool_called);
        self
    }
}
