//! Pipeline stages of the conversation graph.
//!
//! Each stage is a [`Node`](crate::node::Node) that reads a state snapshot
//! and returns a patch naming only the fields it changed:
//!
//! - [`RetrieveNode`] queries the vector store for supporting snippets.
//! - [`AgentNode`] decides whether to call the metadata tool.
//! - [`GenerateNode`] drafts the grounded answer.

pub mod agent;
pub mod generate;
pub mod retrieve;

pub use agent::{AgentNode, METADATA_DEGRADED_TEXT};
pub use generate::GenerateNode;
pub use retrieve::{NO_CHUNKS_SENTINEL, RETRIEVAL_FAILED_SENTINEL, RetrieveNode};
