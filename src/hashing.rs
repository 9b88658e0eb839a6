//! Hashing System - SHA-512 for Image Content
//!
//! Hashes are hex encoded and stable across runs, so an unchanged file keeps
//! the same key in the object store.

use std::path::Path;

use sha2::{Digest, Sha512};

/// Compute SHA-512 hash of bytes, return hex string
pub fn sha512_hex(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Read a file and hash its contents
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let data = tokio::fs::read(path).await?;
    Ok(sha512_hex(&data))
}
