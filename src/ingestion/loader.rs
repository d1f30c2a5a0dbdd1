//! Source-document loaders.
//!
//! The pipeline only needs text plus page-level provenance; the
//! [`DocumentLoader`] seam keeps extraction backends swappable.
//! [`PdfLoader`] handles the primary corpus format, [`PlainTextLoader`]
//! covers `.txt`/`.md` sources, and [`CompositeLoader`] dispatches a mixed
//! directory across both.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

/// Text extracted from one page of a source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentPage {
    pub text: String,
    /// Zero-based page number within the source.
    pub page: usize,
}

/// A fully extracted source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    pub source: PathBuf,
    pub pages: Vec<DocumentPage>,
}

impl LoadedDocument {
    /// Full document text with pages joined by blank lines.
    #[must_use]
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(policygraph::loader::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported document type: {path}")]
    #[diagnostic(code(policygraph::loader::unsupported))]
    Unsupported { path: PathBuf },

    #[error("failed to extract text from {path}: {message}")]
    #[diagnostic(code(policygraph::loader::extract))]
    Extract { path: PathBuf, message: String },
}

/// Opaque text extractor for source documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader can extract the given file.
    fn supports(&self, path: &Path) -> bool;

    /// Extract text and page provenance from the file.
    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError>;
}

/// Reference loader for plain-text sources.
///
/// Form feeds (`\x0c`) delimit pages, matching how text exports of paged
/// documents commonly mark page breaks; sources without form feeds load as a
/// single page.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    fn supports(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        )
    }

    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError> {
        if !self.supports(path) {
            return Err(LoaderError::Unsupported {
                path: path.to_path_buf(),
            });
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoaderError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(LoadedDocument {
            source: path.to_path_buf(),
            pages: pages_from_text(&raw),
        })
    }
}

/// PDF loader backed by `pdf-extract`.
///
/// Extraction runs on the blocking pool; form feeds in the extracted text
/// delimit pages, a text stream without them loads as a single page.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }

    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError> {
        if !self.supports(path) {
            return Err(LoaderError::Unsupported {
                path: path.to_path_buf(),
            });
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| LoaderError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let extracted = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| err.to_string())
        .and_then(|inner| inner)
        .map_err(|message| LoaderError::Extract {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(LoadedDocument {
            source: path.to_path_buf(),
            pages: pages_from_text(&extracted),
        })
    }
}

/// Delegates each file to the first registered loader that supports it.
pub struct CompositeLoader {
    loaders: Vec<std::sync::Arc<dyn DocumentLoader>>,
}

impl CompositeLoader {
    /// Standard corpus coverage: PDF plus plain text.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            loaders: vec![
                std::sync::Arc::new(PdfLoader),
                std::sync::Arc::new(PlainTextLoader),
            ],
        }
    }

    #[must_use]
    pub fn new(loaders: Vec<std::sync::Arc<dyn DocumentLoader>>) -> Self {
        Self { loaders }
    }
}

#[async_trait]
impl DocumentLoader for CompositeLoader {
    fn supports(&self, path: &Path) -> bool {
        self.loaders.iter().any(|l| l.supports(path))
    }

    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError> {
        for loader in &self.loaders {
            if loader.supports(path) {
                return loader.load(path).await;
            }
        }
        Err(LoaderError::Unsupported {
            path: path.to_path_buf(),
        })
    }
}

/// Splits extracted text into trimmed pages on form-feed marks (`\x0c`), the
/// common page-break convention of text exports.
fn pages_from_text(raw: &str) -> Vec<DocumentPage> {
    raw.split('\x0c')
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page, text)| DocumentPage {
            text: text.trim().to_string(),
            page,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_single_page_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        tokio::fs::write(&path, "Employees must report incidents.")
            .await
            .unwrap();

        let doc = PlainTextLoader.load(&path).await.unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].page, 0);
        assert_eq!(doc.text(), "Employees must report incidents.");
    }

    #[tokio::test]
    async fn form_feed_delimits_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        tokio::fs::write(&path, "page one\x0cpage two\x0c")
            .await
            .unwrap();

        let doc = PlainTextLoader.load(&path).await.unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].text, "page two");
        assert_eq!(doc.pages[1].page, 1);
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00]).await.unwrap();

        let err = PlainTextLoader.load(&path).await.unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }

    #[test]
    fn supports_only_text_extensions() {
        assert!(PlainTextLoader.supports(Path::new("a.txt")));
        assert!(PlainTextLoader.supports(Path::new("a.md")));
        assert!(!PlainTextLoader.supports(Path::new("a.pdf")));
    }

    #[test]
    fn pdf_loader_supports_pdf_case_insensitively() {
        assert!(PdfLoader.supports(Path::new("policy.pdf")));
        assert!(PdfLoader.supports(Path::new("POLICY.PDF")));
        assert!(!PdfLoader.supports(Path::new("policy.md")));
    }

    #[tokio::test]
    async fn malformed_pdf_is_an_extract_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"this is not a pdf").await.unwrap();

        let err = PdfLoader.load(&path).await.unwrap_err();
        assert!(matches!(err, LoaderError::Extract { .. }));
    }

    #[tokio::test]
    async fn composite_routes_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        tokio::fs::write(&path, "plain text body").await.unwrap();

        let loader = CompositeLoader::standard();
        assert!(loader.supports(Path::new("a.pdf")));
        assert!(loader.supports(Path::new("a.md")));
        assert!(!loader.supports(Path::new("a.docx")));

        let doc = loader.load(&path).await.unwrap();
        assert_eq!(doc.text(), "plain text body");

        let err = loader.load(&dir.path().join("a.docx")).await.unwrap_err();
        assert!(matches!(err, LoaderError::Unsupported { .. }));
    }
}
