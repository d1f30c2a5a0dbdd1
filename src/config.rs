//! Runtime configuration with environment overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ingestion::TextSplitter;
use crate::providers::ModelSettings;

/// Tunables for ingestion and conversation turns.
///
/// Defaults are serviceable out of the box; [`PolicyConfig::from_env`]
/// overlays `POLICYGRAPH_*` environment variables (a `.env` file is honored
/// when present).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Directory scanned for policy documents.
    pub docs_dir: PathBuf,
    /// Path of the processed-documents registry file.
    pub registry_path: PathBuf,
    /// Directory timestamped copies of ingested files are archived to.
    /// `None` disables archiving.
    pub archive_dir: Option<PathBuf>,
    /// Path of the policy metadata table.
    pub metadata_csv_path: PathBuf,
    /// Maximum chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in bytes.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Chat model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature for the chat model.
    pub temperature: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            registry_path: PathBuf::from("data/processed_documents.json"),
            archive_dir: None,
            metadata_csv_path: PathBuf::from("data/pr_metadata.csv"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
        }
    }
}

impl PolicyConfig {
    /// Builds the config from defaults plus `POLICYGRAPH_*` environment
    /// variables. Unparseable numeric overrides are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(v) = std::env::var("POLICYGRAPH_DOCS_DIR") {
            config.docs_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("POLICYGRAPH_REGISTRY_PATH") {
            config.registry_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("POLICYGRAPH_ARCHIVE_DIR") {
            config.archive_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("POLICYGRAPH_METADATA_CSV") {
            config.metadata_csv_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("POLICYGRAPH_MODEL") {
            config.model = v;
        }
        overlay_parsed(&mut config.chunk_size, "POLICYGRAPH_CHUNK_SIZE");
        overlay_parsed(&mut config.chunk_overlap, "POLICYGRAPH_CHUNK_OVERLAP");
        overlay_parsed(&mut config.top_k, "POLICYGRAPH_TOP_K");
        overlay_parsed(&mut config.temperature, "POLICYGRAPH_TEMPERATURE");

        config
    }

    /// Splitter configured with this config's chunking tunables.
    #[must_use]
    pub fn splitter(&self) -> TextSplitter {
        TextSplitter::new(self.chunk_size, self.chunk_overlap)
    }

    /// Settings a concrete chat backend is constructed with.
    #[must_use]
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}

fn overlay_parsed<T: std::str::FromStr>(slot: &mut T, var: &str) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(var, raw, "ignoring unparseable override"),
        }
    }
}
