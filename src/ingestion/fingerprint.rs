//! Content fingerprinting for source documents.
//!
//! The fingerprint is a SHA-256 digest over file bytes, hex-encoded. It is the
//! sole admission key into the document registry: identical bytes fingerprint
//! identically regardless of file name or location.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Fingerprints raw bytes.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprints a file's content.
///
/// Fails only on unreadable input; callers treat that as an ingestion failure
/// for the one file, never as fatal to a batch.
pub async fn fingerprint_file(path: &Path) -> io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(fingerprint_bytes(&bytes))
}
