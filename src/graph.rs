//! Linear conversation graph: Retrieve, then Agent, then Generate.
//!
//! One [`PolicyGraph::invoke`] call runs a full turn. The thread's latest
//! checkpoint (if any) is loaded first, the user message is appended, the
//! three stages run in order with each patch applied to the shared state, and
//! the result is checkpointed only when every stage succeeded. A failed stage
//! therefore leaves the previous checkpoint untouched and the turn can be
//! retried as if it never happened.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::providers::ChatModel;
use crate::runtimes::{Checkpoint, Checkpointer, CheckpointerError};
use crate::state::ConversationState;
use crate::stores::VectorStore;
use crate::tools::ToolRegistry;

/// Position in the turn's fixed stage sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Retrieve,
    Agent,
    Generate,
    Done,
}

impl Stage {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Retrieve => Self::Agent,
            Self::Agent => Self::Generate,
            Self::Generate | Self::Done => Self::Done,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::Agent => "agent",
            Self::Generate => "generate",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A stage failed; the turn was aborted and no checkpoint was written.
    #[error("stage '{stage}' failed")]
    #[diagnostic(code(policygraph::graph::stage))]
    Node {
        stage: Stage,
        #[source]
        #[diagnostic_source]
        source: NodeError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointerError),

    /// The builder was finished without a required component.
    #[error("graph is missing its {what}")]
    #[diagnostic(code(policygraph::graph::incomplete))]
    Incomplete { what: &'static str },
}

/// Result of one completed turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub context: String,
    pub metadata_text: String,
}

impl TurnOutcome {
    /// The answer produced this turn (the latest assistant message).
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        crate::message::latest_with_role(&self.messages, crate::message::Role::Assistant)
    }
}

/// The assembled three-stage conversation pipeline.
pub struct PolicyGraph {
    retrieve: Arc<dyn Node>,
    agent: Arc<dyn Node>,
    generate: Arc<dyn Node>,
    checkpointer: Arc<dyn Checkpointer>,
}

impl fmt::Debug for PolicyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyGraph")
            .field("stages", &[Stage::Retrieve, Stage::Agent, Stage::Generate])
            .finish_non_exhaustive()
    }
}

impl PolicyGraph {
    #[must_use]
    pub fn builder() -> PolicyGraphBuilder {
        PolicyGraphBuilder::default()
    }

    /// Wires the standard stages from their collaborators.
    #[must_use]
    pub fn standard(
        store: Arc<dyn VectorStore>,
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        checkpointer: Arc<dyn Checkpointer>,
        top_k: usize,
    ) -> Self {
        Self {
            retrieve: Arc::new(crate::nodes::RetrieveNode::new(store, top_k)),
            agent: Arc::new(crate::nodes::AgentNode::new(model.clone(), tools)),
            generate: Arc::new(crate::nodes::GenerateNode::new(model)),
            checkpointer,
        }
    }

    /// Standard wiring driven by a [`PolicyConfig`](crate::config::PolicyConfig):
    /// the metadata tool reads the configured table and retrieval uses the
    /// configured top-k.
    #[must_use]
    pub fn standard_with_config(
        config: &crate::config::PolicyConfig,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn ChatModel>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        let tools = Arc::new(ToolRegistry::new().register(Arc::new(
            crate::tools::MetadataLookupTool::new(config.metadata_csv_path.clone()),
        )));
        Self::standard(store, model, tools, checkpointer, config.top_k)
    }

    fn node_for(&self, stage: Stage) -> Option<&Arc<dyn Node>> {
        match stage {
            Stage::Retrieve => Some(&self.retrieve),
            Stage::Agent => Some(&self.agent),
            Stage::Generate => Some(&self.generate),
            Stage::Done => None,
        }
    }

    /// Runs one conversation turn for `thread_id`.
    ///
    /// Resumes from the thread's latest checkpoint when one exists; a fresh
    /// thread starts from empty state. The returned outcome reflects the
    /// checkpointed state.
    pub async fn invoke(
        &self,
        thread_id: &str,
        user_text: &str,
    ) -> Result<TurnOutcome, GraphError> {
        let (mut state, mut step) = match self.checkpointer.load_latest(thread_id).await? {
            Some(checkpoint) => (checkpoint.state, checkpoint.step),
            None => (ConversationState::default(), 0),
        };
        state.push(Message::user(user_text));

        let mut stage = Stage::Retrieve;
        while let Some(node) = self.node_for(stage) {
            step += 1;
            tracing::debug!(thread_id, stage = %stage, step, "running stage");
            let ctx = NodeContext::new(stage.as_str(), step);
            let patch = node
                .run(state.snapshot(), ctx)
                .await
                .map_err(|source| GraphError::Node { stage, source })?;
            state.apply(patch);
            stage = stage.next();
        }

        self.checkpointer
            .save(Checkpoint::new(thread_id, step, state.clone()))
            .await?;

        Ok(TurnOutcome {
            thread_id: thread_id.to_string(),
            messages: state.messages,
            context: state.context,
            metadata_text: state.metadata_text,
        })
    }
}

/// Assembles a [`PolicyGraph`] stage by stage. Mostly useful in tests that
/// substitute a scripted stage; production code uses [`PolicyGraph::standard`].
#[derive(Default)]
pub struct PolicyGraphBuilder {
    retrieve: Option<Arc<dyn Node>>,
    agent: Option<Arc<dyn Node>>,
    generate: Option<Arc<dyn Node>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
}

impl PolicyGraphBuilder {
    #[must_use]
    pub fn retrieve(mut self, node: Arc<dyn Node>) -> Self {
        self.retrieve = Some(node);
        self
    }

    #[must_use]
    pub fn agent(mut self, node: Arc<dyn Node>) -> Self {
        self.agent = Some(node);
        self
    }

    #[must_use]
    pub fn generate(mut self, node: Arc<dyn Node>) -> Self {
        self.generate = Some(node);
        self
    }

    #[must_use]
    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn build(self) -> Result<PolicyGraph, GraphError> {
        Ok(PolicyGraph {
            retrieve: self
                .retrieve
                .ok_or(GraphError::Incomplete { what: "retrieve stage" })?,
            agent: self
                .agent
                .ok_or(GraphError::Incomplete { what: "agent stage" })?,
            generate: self
                .generate
                .ok_or(GraphError::Incomplete { what: "generate stage" })?,
            checkpointer: self
                .checkpointer
                .ok_or(GraphError::Incomplete { what: "checkpointer" })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtimes::InMemoryCheckpointer;
    use crate::state::{StatePatch, StateSnapshot};
    use async_trait::async_trait;

    struct PatchNode {
        patch: StatePatch,
    }

    #[async_trait]
    impl Node for PatchNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<StatePatch, NodeError> {
            Ok(self.patch.clone())
        }
    }

    struct FailNode;

    #[async_trait]
    impl Node for FailNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<StatePatch, NodeError> {
            Err(NodeError::Provider {
                provider: "stub",
                message: "down".into(),
            })
        }
    }

    fn patch_node(patch: StatePatch) -> Arc<dyn Node> {
        Arc::new(PatchNode { patch })
    }

    fn happy_graph(checkpointer: Arc<dyn Checkpointer>) -> PolicyGraph {
        PolicyGraph::builder()
            .retrieve(patch_node(StatePatch::new().with_context("[Source: a.md] text")))
            .agent(patch_node(StatePatch::new()))
            .generate(patch_node(
                StatePatch::new().with_messages(vec![Message::assistant("the answer")]),
            ))
            .checkpointer(checkpointer)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn successful_turn_checkpoints_and_returns_answer() {
        let cp = Arc::new(InMemoryCheckpointer::new());
        let graph = happy_graph(cp.clone());

        let outcome = graph.invoke("t1", "question?").await.unwrap();
        assert_eq!(outcome.answer(), Some("the answer"));
        assert_eq!(outcome.context, "[Source: a.md] text");

        let checkpoint = cp.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(checkpoint.step, 3);
        assert_eq!(checkpoint.state.messages.len(), 2);
    }

    #[tokio::test]
    async fn second_turn_resumes_from_checkpoint() {
        let cp = Arc::new(InMemoryCheckpointer::new());
        let graph = happy_graph(cp.clone());

        graph.invoke("t1", "first?").await.unwrap();
        let outcome = graph.invoke("t1", "second?").await.unwrap();

        // user, assistant, user, assistant
        assert_eq!(outcome.messages.len(), 4);
        assert_eq!(cp.load_latest("t1").await.unwrap().unwrap().step, 6);
    }

    #[tokio::test]
    async fn threads_do_not_share_state() {
        let cp = Arc::new(InMemoryCheckpointer::new());
        let graph = happy_graph(cp);

        graph.invoke("a", "first?").await.unwrap();
        let outcome = graph.invoke("b", "other?").await.unwrap();
        assert_eq!(outcome.messages.len(), 2);
    }

    #[tokio::test]
    async fn failed_stage_leaves_no_checkpoint() {
        let cp = Arc::new(InMemoryCheckpointer::new());
        let graph = PolicyGraph::builder()
            .retrieve(patch_node(StatePatch::new().with_context("ctx")))
            .agent(patch_node(StatePatch::new()))
            .generate(Arc::new(FailNode))
            .checkpointer(cp.clone())
            .build()
            .unwrap();

        let err = graph.invoke("t1", "question?").await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::Node {
                stage: Stage::Generate,
                ..
            }
        ));
        assert!(cp.load_latest("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_stage_preserves_previous_checkpoint() {
        let cp = Arc::new(InMemoryCheckpointer::new());
        let graph = happy_graph(cp.clone());
        graph.invoke("t1", "first?").await.unwrap();

        let broken = PolicyGraph::builder()
            .retrieve(Arc::new(FailNode))
            .agent(patch_node(StatePatch::new()))
            .generate(patch_node(StatePatch::new()))
            .checkpointer(cp.clone())
            .build()
            .unwrap();
        broken.invoke("t1", "second?").await.unwrap_err();

        let checkpoint = cp.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(checkpoint.step, 3);
        assert_eq!(checkpoint.state.messages.len(), 2);
    }

    #[test]
    fn stage_sequence_terminates() {
        assert_eq!(Stage::Retrieve.next(), Stage::Agent);
        assert_eq!(Stage::Agent.next(), Stage::Generate);
        assert_eq!(Stage::Generate.next(), Stage::Done);
        assert_eq!(Stage::Done.next(), Stage::Done);
    }

    #[test]
    fn builder_requires_every_stage() {
        let err = PolicyGraph::builder().build().unwrap_err();
        assert!(matches!(err, GraphError::Incomplete { .. }));
    }

    #[test]
    fn graph_debug_names_the_stage_sequence() {
        let graph = happy_graph(Arc::new(InMemoryCheckpointer::new()));
        let rendered = format!("{graph:?}");
        assert!(rendered.contains("PolicyGraph"));
        assert!(rendered.contains("Retrieve"));
    }
}
