//! Content identity: SHA-256 hex digests of paths and content.
//!
//! Both functions are pure. Equal inputs give equal ids on every run and every
//! machine, which is what upload dedup and move detection rely on.

use sha2::{Digest, Sha256};

use crate::types::{FileId, VersionId};

/// SHA-256 of `bytes`, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Identity of a project-relative path.
///
/// Windows separators are normalised to `/` first.
pub fn compute_file_id(file_name: &str) -> FileId {
    let normalized = file_name.replace('\\', "/");
    FileId(sha256_hex(normalized.as_bytes()))
}

/// Identity of an exact piece of content.
pub fn compute_version_id(content: &str) -> VersionId {
    VersionId(sha256_hex(content.as_bytes()))
}
