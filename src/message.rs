//! Role-tagged conversation messages.
//!
//! Messages are the unit of conversational history flowing through the
//! orchestration pipeline. Each message carries a [`Role`] and text content.
//! The history is append-only within a turn: nodes contribute new messages
//! through state patches, never by editing earlier turns.
//!
//! # Examples
//!
//! ```
//! use policygraph::message::{Message, Role};
//!
//! let user_msg = Message::user("Who owns the Data Privacy Policy?");
//! let tool_msg = Message::tool("- Data Privacy Policy | status: Published | ...");
//!
//! assert!(user_msg.has_role(Role::User));
//! assert!(tool_msg.has_role(Role::Tool));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The originator of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt or instruction.
    System,
    /// End-user input.
    User,
    /// Model-generated response.
    Assistant,
    /// Output captured from a tool invocation.
    Tool,
}

impl Role {
    /// Stable string form used in prompts and persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
///
/// Use the convenience constructors ([`Message::user`], [`Message::assistant`],
/// [`Message::system`], [`Message::tool`]) rather than struct literals.
///
/// # Serialization
///
/// Messages serialize to `{"role": "...", "content": "..."}`, which is the
/// shape checkpoint stores persist and chat providers consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a tool-output message.
    #[must_use]
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Returns the content of the most recent message with the given role, if any.
#[must_use]
pub fn latest_with_role(messages: &[Message], role: Role) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == role)
        .map(|m| m.content.as_str())
}
