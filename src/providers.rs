//! Opaque chat-completion collaborator.
//!
//! The pipeline treats the language model as a text-completion service behind
//! the [`ChatModel`] trait: it supplies system instructions plus the full
//! conversation, and gets back untrusted natural-language text, optionally
//! accompanied by a single tool-call request. Constructing a concrete client
//! (HTTP, local inference, a scripted fake in tests) is the caller's concern;
//! the pipeline only ever holds an injected `Arc<dyn ChatModel>`.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;

/// Generation settings a concrete chat backend is constructed with. Built
/// from [`PolicyConfig::model_settings`](crate::config::PolicyConfig::model_settings).
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    /// Provider-side model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A request by the model to invoke a named tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    /// Name of the tool to invoke, resolved against the tool registry.
    pub name: String,
    /// Free-form argument text (for the metadata tool, the lookup query).
    pub arguments: String,
}

/// The outcome of one chat completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    /// Generated text; may be empty when the model only requests a tool.
    pub content: String,
    /// Tool invocation requested by the model, if any.
    pub tool_call: Option<ToolCall>,
}

impl Completion {
    /// A plain text completion with no tool call.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_call: None,
        }
    }

    /// A completion that requests a tool invocation.
    #[must_use]
    pub fn tool(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            tool_call: Some(ToolCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }
}

/// Opaque text-completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation under the given system instructions.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
    ) -> Result<Completion, ProviderError>;
}

/// Errors surfaced by a chat-completion backend.
///
/// These are terminal for the turn that triggered them; retry policy belongs
/// to the operational layer, not the pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("chat completion failed ({provider}): {message}")]
    #[diagnostic(
        code(policygraph::provider::request),
        help("The turn was aborted without mutating conversation state; retry the request.")
    )]
    Request { provider: String, message: String },
}

impl ProviderError {
    #[must_use]
    pub fn request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
