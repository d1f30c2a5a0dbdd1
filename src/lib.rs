//! # Policygraph: Grounded Policy Question-Answering Pipeline
//!
//! Policygraph ingests a directory of policy documents into a vector store
//! and answers questions about them through a fixed three-stage conversation
//! graph with per-thread checkpointing.
//!
//! ## Core Concepts
//!
//! - **Ingestion**: fingerprint-deduplicated document registration, chunking,
//!   and embedding ([`ingestion`])
//! - **Stages**: retrieve, agent (tool routing), and generate nodes run in
//!   order each turn ([`nodes`], [`graph`])
//! - **State**: a typed conversation record mutated only through stage
//!   patches ([`state`])
//! - **Checkpointing**: completed turns are persisted per thread id
//!   ([`runtimes`])
//!
//! ## Working with Messages
//!
//! ```
//! use policygraph::message::{Message, Role};
//!
//! let user = Message::user("Who owns the data privacy policy?");
//! let answer = Message::assistant("The Ops Team owns it.");
//!
//! assert!(user.has_role(Role::User));
//! assert_eq!(answer.role, Role::Assistant);
//! ```
//!
//! ## Conversation State
//!
//! Stages never mutate state directly; they return a [`state::StatePatch`]
//! naming only the fields they changed, and the graph applies it:
//!
//! ```
//! use policygraph::message::Message;
//! use policygraph::state::{ConversationState, StatePatch};
//!
//! let mut state = ConversationState::new_with_user_message("Retention period?");
//! state.apply(
//!     StatePatch::new()
//!         .with_context("[Source: privacy.md] Data is retained for 30 days.")
//!         .with_messages(vec![Message::assistant("30 days.")]),
//! );
//!
//! assert_eq!(state.latest_assistant_message(), Some("30 days."));
//! assert!(!state.tool_called);
//! ```
//!
//! ## Assembling the Pipeline
//!
//! [`graph::PolicyGraph::standard`] wires the stages from a vector store, a
//! chat model, a tool registry, and a checkpointer; `invoke(thread_id, text)`
//! then runs one full turn and checkpoints the result.

pub mod config;
pub mod graph;
pub mod ingestion;
pub mod message;
pub mod node;
pub mod nodes;
pub mod providers;
pub mod runtimes;
pub mod state;
pub mod stores;
pub mod telemetry;
pub mod tools;

pub use config::PolicyConfig;
pub use graph::{GraphError, PolicyGraph, Stage, TurnOutcome};
pub use message::{Message, Role};
pub use state::{ConversationState, StatePatch, StateSnapshot};
