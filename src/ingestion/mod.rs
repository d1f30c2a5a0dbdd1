//! Document ingestion: fingerprinting, dedup tracking, extraction, chunking.
//!
//! ```text
//! source dir ──► DocumentRegistry::unprocessed ──► DocumentLoader
//!                                                      │
//!                         register (fingerprint) ◄─────┤
//!                                                      ▼
//!                                TextSplitter ──► Chunk batch ──► VectorStore::add
//! ```

pub mod chunk;
pub mod fingerprint;
pub mod loader;
pub mod pipeline;
pub mod registry;

pub use chunk::{Chunk, ChunkMetadata, TextSplitter};
pub use loader::{
    CompositeLoader, DocumentLoader, DocumentPage, LoadedDocument, LoaderError, PdfLoader,
    PlainTextLoader,
};
pub use pipeline::{IngestError, IngestOutcome, IngestReport, IngestionPipeline};
pub use registry::{DocumentMeta, DocumentRecord, DocumentRegistry, DocumentState, RegistryError};
