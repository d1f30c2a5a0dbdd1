//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use policygraph::message::Message;
use policygraph::providers::{ChatModel, Completion, ProviderError};
use policygraph::stores::{Embedder, InMemoryVectorStore};

/// Deterministic bag-of-words embedder over a fixed vocabulary. Texts that
/// share vocabulary words rank closer, which is all retrieval tests need.
pub struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocab: Vec<&'static str>) -> Self {
        Self { vocab }
    }

    pub fn policy_vocab() -> Self {
        Self::new(vec![
            "privacy", "retention", "data", "incident", "security", "vacation", "leave",
        ])
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocab
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

pub fn keyword_store() -> Arc<InMemoryVectorStore> {
    Arc::new(InMemoryVectorStore::new(Arc::new(
        KeywordEmbedder::policy_vocab(),
    )))
}

/// Chat model that replays a fixed script of completions, recording every
/// prompt it was given. An exhausted script fails the request.
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<Result<Completion, String>>>,
    pub calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedChatModel {
    pub fn new(script: Vec<Result<Completion, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script for one turn that needs no tool: agent answers plainly, then
    /// the generator produces `answer`.
    pub fn no_tool_turn(answer: &str) -> Self {
        Self::new(vec![
            Ok(Completion::text("No metadata needed.")),
            Ok(Completion::text(answer)),
        ])
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(s, _)| s.clone()).collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
    ) -> Result<Completion, ProviderError> {
        self.calls
            .lock()
            .push((system.to_string(), messages.to_vec()));
        match self.script.lock().pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(ProviderError::request("scripted", message)),
            None => Err(ProviderError::request("scripted", "script exhausted")),
        }
    }
}

/// Writes `files` (name, contents) under `dir`.
pub fn write_docs(dir: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
}

/// Writes a policy metadata table with the standard header.
pub fn write_metadata_csv(path: &Path, rows: &[&str]) {
    let mut table =
        String::from("policy_title,published_status,managers,business_owner,review_cycle\n");
    for row in rows {
        table.push_str(row);
        table.push('\n');
    }
    std::fs::write(path, table).unwrap();
}
