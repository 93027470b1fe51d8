//! Content fingerprints for crawled pages

use sha2::{Digest, Sha256};

/// Computes a stable fingerprint of page text
pub trait ContentHasher {
    fn hash(&self, content: &str) -> String;
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of the content
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}
