//! Hashing utilities for cache keys.
//!
//! Provides deterministic hashing so remote URLs map to stable blob keys.

use sha2::{Digest, Sha256};

/// Compute the disk-cache key for a URL.
///
/// Returns the lowercase hex SHA-256 of the URL bytes (64 chars), which is
/// always a valid blob key regardless of the characters in the URL.
pub fn hash_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let hash1 = hash_url("https://cdn.example.com/a.png");
        let hash2 = hash_url("https://cdn.example.com/a.png");
        assert_eq!(hash1, hash2, "Same url should produce same hash");
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_url("https://cdn.example.com/a.png?size=64");
        assert_eq!(hash.len(), 64, "Hash should be 64 hex chars (32 bytes)");
        assert!(
            hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "Hash should only contain lowercase hex digits"
        );
    }

    #[test]
    fn test_distinct_urls_distinct_hashes() {
        assert_ne!(hash_url("https://a/1"), hash_url("https://a/2"));
    }
}
