//! Runtime services that sit underneath the conversation graph.

pub mod checkpointer;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, ThreadId};
