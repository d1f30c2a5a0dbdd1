//! Persistent registry of ingested documents, keyed by content fingerprint.
//!
//! The registry decides which source files are new and must be embedded. A
//! file whose fingerprint is already present is never re-ingested; a file
//! whose derived title matches an existing record but whose content differs is
//! reported as a different version and registered as a distinct record;
//! superseding or retiring the old record is a policy decision left to the
//! operator, not automated here.
//!
//! The full mapping is persisted as one JSON document and flushed after every
//! mutation, so one file's failure cannot lose another file's registration.
//! Writes go through an advisory lockfile and a temp-then-rename replace, and
//! on-disk entries written by a concurrent ingester are merged back in under
//! the lock before replacing the file.
//!
//! A missing, unreadable, or malformed registry file loads as an empty
//! registry with a warning. This fails open on purpose: ingestion must be able
//! to proceed after registry loss, at the cost of re-admitting previously
//! deduplicated files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use super::fingerprint::fingerprint_file;

/// One registered document. The fingerprint is the registry's primary key;
/// `source_path` is provenance for display, never identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub fingerprint: String,
    /// Derived from the filename stem; used for version-collision detection.
    pub title: String,
    pub section: Option<String>,
    pub effective_date: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub source_path: String,
    /// Path of the archived copy taken at ingestion time, if any.
    pub archived_path: Option<String>,
    pub file_size: u64,
}

/// Descriptive metadata supplied when registering a document.
#[derive(Clone, Debug, Default)]
pub struct DocumentMeta {
    pub title: String,
    pub section: Option<String>,
    pub effective_date: Option<String>,
    pub archived_path: Option<String>,
}

impl DocumentMeta {
    /// Title from the filename stem, everything else unset.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self {
            title: title_of(path),
            ..Default::default()
        }
    }
}

/// Admission state of a candidate source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentState {
    /// Content fingerprint not seen and no existing record shares the title.
    New,
    /// Exact content already registered (regardless of name or location).
    AlreadyProcessed,
    /// Another record shares this file's title but has different content.
    DifferentVersionExists,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    #[diagnostic(code(policygraph::registry::io))]
    Io(#[from] io::Error),

    #[error(transparent)]
    #[diagnostic(code(policygraph::registry::serde))]
    Serialize(#[from] serde_json::Error),

    #[error("source directory {path} is unreadable")]
    #[diagnostic(code(policygraph::registry::source_dir))]
    SourceDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out acquiring registry lock at {path}")]
    #[diagnostic(
        code(policygraph::registry::locked),
        help("Another ingestion run may hold the lock; remove the stale lockfile if no run is active.")
    )]
    Locked { path: PathBuf },
}

/// Persistent fingerprint → record mapping.
pub struct DocumentRegistry {
    path: PathBuf,
    entries: Arc<Mutex<FxHashMap<String, DocumentRecord>>>,
}

impl DocumentRegistry {
    /// Loads the registry at `path`, treating missing or corrupt persisted
    /// state as an empty registry.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str::<FxHashMap<String, DocumentRecord>>(&data) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "document registry is malformed; starting from an empty registry"
                    );
                    FxHashMap::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => FxHashMap::default(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "document registry is unreadable; starting from an empty registry"
                );
                FxHashMap::default()
            }
        };
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Classifies a candidate file. Fingerprint identity always wins over the
    /// weaker title match.
    pub async fn state_of(&self, file: &Path) -> Result<DocumentState, RegistryError> {
        let fingerprint = fingerprint_file(file).await?;
        let title = title_of(file);
        let guard = self.entries.lock().await;
        if guard.contains_key(&fingerprint) {
            return Ok(DocumentState::AlreadyProcessed);
        }
        if guard.values().any(|record| record.title == title) {
            return Ok(DocumentState::DifferentVersionExists);
        }
        Ok(DocumentState::New)
    }

    /// Registers (or overwrites) the record for `file`'s content and flushes
    /// the full registry to disk immediately.
    pub async fn register(
        &self,
        file: &Path,
        meta: DocumentMeta,
    ) -> Result<DocumentRecord, RegistryError> {
        let fingerprint = fingerprint_file(file).await?;
        let file_size = fs::metadata(file).await?.len();
        let record = DocumentRecord {
            fingerprint: fingerprint.clone(),
            title: meta.title,
            section: meta.section,
            effective_date: meta.effective_date,
            processed_at: Utc::now(),
            source_path: file.display().to_string(),
            archived_path: meta.archived_path,
            file_size,
        };

        let mut guard = self.entries.lock().await;
        guard.insert(fingerprint, record.clone());
        self.persist(&mut guard).await?;
        tracing::info!(
            title = %record.title,
            source = %record.source_path,
            "registered document"
        );
        Ok(record)
    }

    /// Files in `directory` (lexicographic order) whose state is [`DocumentState::New`].
    ///
    /// Dotfiles are ignored. A candidate that cannot be fingerprinted is
    /// skipped with a warning and stays eligible for the next run.
    pub async fn unprocessed(&self, directory: &Path) -> Result<Vec<PathBuf>, RegistryError> {
        let mut reader =
            fs::read_dir(directory)
                .await
                .map_err(|source| RegistryError::SourceDir {
                    path: directory.to_path_buf(),
                    source,
                })?;

        let mut candidates = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
            {
                continue;
            }
            candidates.push(path);
        }
        candidates.sort();

        let mut fresh = Vec::new();
        for path in candidates {
            match self.state_of(&path).await {
                Ok(DocumentState::New) => fresh.push(path),
                Ok(state) => {
                    tracing::debug!(path = %path.display(), ?state, "skipping known document");
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "cannot fingerprint candidate; leaving it for the next run"
                    );
                }
            }
        }
        Ok(fresh)
    }

    /// Provenance paths of every registered document, for display and audit.
    pub async fn processed_files(&self) -> Vec<String> {
        let guard = self.entries.lock().await;
        let mut paths: Vec<String> = guard.values().map(|r| r.source_path.clone()).collect();
        paths.sort();
        paths
    }

    /// The record matching `file`'s current content, if one exists.
    pub async fn record_for(&self, file: &Path) -> Result<Option<DocumentRecord>, RegistryError> {
        let fingerprint = fingerprint_file(file).await?;
        let guard = self.entries.lock().await;
        Ok(guard.get(&fingerprint).cloned())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Writes the full registry snapshot under the advisory lockfile.
    ///
    /// Entries written to disk by another process since our load are merged
    /// back in (ours win on conflict) so concurrent ingestion runs cannot
    /// silently drop each other's registrations.
    async fn persist(
        &self,
        entries: &mut FxHashMap<String, DocumentRecord>,
    ) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let _lock = LockFile::acquire(&self.lock_path()).await?;

        if let Ok(data) = fs::read_to_string(&self.path).await {
            if let Ok(disk) = serde_json::from_str::<FxHashMap<String, DocumentRecord>>(&data) {
                for (fingerprint, record) in disk {
                    entries.entry(fingerprint).or_insert(record);
                }
            }
        }

        let serialized = serde_json::to_string_pretty(&*entries)?;
        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        fs::write(&tmp, serialized).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.lock", self.path.display()))
    }
}

/// RAII advisory lockfile; created with `create_new`, removed on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: &Path) -> Result<Self, RegistryError> {
        for _ in 0..50 {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await
            {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(RegistryError::Locked {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn title_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
