//! Source-directory ingestion: dedup, extract, chunk, embed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;

use super::chunk::{Chunk, ChunkMetadata, TextSplitter};
use super::loader::DocumentLoader;
use super::registry::{DocumentMeta, DocumentRegistry, RegistryError};
use crate::stores::{StoreError, VectorStore};

/// What an ingestion run amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No unprocessed files were found (or none survived extraction); nothing
    /// reached the embedding store.
    NothingNew,
    /// At least one document was registered this run.
    Ingested,
}

/// Summary of one ingestion run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    /// Documents registered this run.
    pub registered: usize,
    /// Files skipped because extraction failed; they stay eligible for retry.
    pub skipped: usize,
    /// Chunks handed to the embedding store.
    pub chunks_added: usize,
}

/// Batch-fatal ingestion failures. Per-file extraction errors are logged and
/// skipped instead of surfacing here.
#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("embedding store rejected the batch: {0}")]
    #[diagnostic(code(policygraph::ingest::store))]
    Store(#[from] StoreError),
}

/// Scans a source directory, ingests unregistered documents, and hands the
/// resulting chunks to the embedding store.
///
/// All collaborators are constructor-injected so tests can substitute fakes.
pub struct IngestionPipeline {
    registry: Arc<DocumentRegistry>,
    loader: Arc<dyn DocumentLoader>,
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    archive_dir: Option<PathBuf>,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        registry: Arc<DocumentRegistry>,
        loader: Arc<dyn DocumentLoader>,
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            registry,
            loader,
            splitter,
            store,
            archive_dir: None,
        }
    }

    /// Archive a timestamped copy of every ingested source file under `dir`.
    #[must_use]
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// Builds a pipeline with chunking and archiving taken from `config`.
    #[must_use]
    pub fn from_config(
        config: &crate::config::PolicyConfig,
        registry: Arc<DocumentRegistry>,
        loader: Arc<dyn DocumentLoader>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let mut pipeline = Self::new(registry, loader, config.splitter(), store);
        if let Some(dir) = &config.archive_dir {
            pipeline = pipeline.with_archive_dir(dir.clone());
        }
        pipeline
    }

    /// Runs one ingestion pass over `source_dir`.
    ///
    /// Files are processed in lexicographic order. A file is registered only
    /// after its extraction succeeds, so failed files remain eligible for the
    /// next run. Registry write failures and an unreachable embedding store
    /// are batch-fatal; everything else degrades to skip-and-continue.
    pub async fn run(&self, source_dir: &Path) -> Result<IngestReport, IngestError> {
        let candidates = self.registry.unprocessed(source_dir).await?;
        tracing::info!(
            source_dir = %source_dir.display(),
            candidates = candidates.len(),
            "starting ingestion pass"
        );

        let mut registered = 0usize;
        let mut skipped = 0usize;
        let mut chunks: Vec<Chunk> = Vec::new();

        for path in candidates {
            if !self.loader.supports(&path) {
                tracing::debug!(path = %path.display(), "loader does not support file; ignoring");
                continue;
            }

            let document = match self.loader.load(&path).await {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "extraction failed; file stays eligible for retry"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let archived_path = match &self.archive_dir {
                Some(dir) => self.archive(dir, &path).await,
                None => None,
            };

            let mut meta = DocumentMeta::from_path(&path);
            meta.effective_date = Some(Utc::now().format("%Y-%m-%d").to_string());
            meta.archived_path = archived_path.clone();
            let record = self.registry.register(&path, meta).await?;

            let source_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            for page in &document.pages {
                for piece in self.splitter.split(&page.text) {
                    chunks.push(Chunk::new(
                        piece,
                        ChunkMetadata {
                            source: source_name.clone(),
                            title: record.title.clone(),
                            effective_date: record.effective_date.clone(),
                            archived_path: archived_path.clone(),
                            page: Some(page.page),
                        },
                    ));
                }
            }
            registered += 1;
        }

        if registered == 0 && chunks.is_empty() {
            tracing::info!(skipped, "no new documents to ingest");
            return Ok(IngestReport {
                outcome: IngestOutcome::NothingNew,
                registered: 0,
                skipped,
                chunks_added: 0,
            });
        }

        let chunks_added = chunks.len();
        if !chunks.is_empty() {
            self.store.add(chunks).await?;
        }
        tracing::info!(registered, skipped, chunks_added, "ingestion pass complete");

        Ok(IngestReport {
            outcome: IngestOutcome::Ingested,
            registered,
            skipped,
            chunks_added,
        })
    }

    /// Copies the source file into the archive directory with a timestamped
    /// name. Archive failures are non-fatal; ingestion proceeds without the
    /// archived-copy provenance.
    async fn archive(&self, dir: &Path, path: &Path) -> Option<String> {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned())?;
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stamped = format!("{stem}_{}{ext}", Utc::now().format("%Y%m%d_%H%M%S"));
        let dest = dir.join(stamped);

        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!(dir = %dir.display(), error = %err, "cannot create archive directory");
            return None;
        }
        match tokio::fs::copy(path, &dest).await {
            Ok(_) => Some(dest.display().to_string()),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "archiving failed; continuing without archived copy"
                );
                None
            }
        }
    }
}
