//! On-demand tool capabilities available to the agent stage.
//!
//! Tools are structured-data lookups (not generative) the model can request
//! by name. The [`ToolRegistry`] keys capabilities by name so new tools can be
//! added without touching the orchestration state machine.

pub mod metadata;

pub use metadata::{MetadataLookupTool, PolicyRecord};

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("tool '{name}' failed: {message}")]
    #[diagnostic(code(policygraph::tool::failed))]
    Failed { name: String, message: String },
}

/// A named, on-demand capability the agent stage can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key the model refers to this tool by.
    fn name(&self) -> &str;

    /// One-line description surfaced in the agent's system instructions.
    fn description(&self) -> &str;

    /// Executes the tool with free-form argument text, returning user-facing
    /// text. Deterministic and side-effect free.
    async fn call(&self, arguments: &str) -> Result<String, ToolError>;
}

/// Capability registry keyed by tool name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name, replacing any previous holder.
    #[must_use]
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted for stable prompt rendering.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `name: description` lines for the agent's system instructions.
    #[must_use]
    pub fn describe(&self) -> String {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
