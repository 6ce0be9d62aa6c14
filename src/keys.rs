//! Key Generation
//!
//! Helpers for producing task keys.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh task keys
pub trait KeyGenerator<K>: Send + Sync {
    fn next_key(&self) -> K;
}

/// Random v4 UUID strings
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeys;

impl KeyGenerator<String> for UuidKeys {
    fn next_key(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Monotonic counter keys
#[derive(Debug, Default)]
pub struct SequentialKeys {
    next: AtomicU64,
}

impl SequentialKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl KeyGenerator<u64> for SequentialKeys {
    fn next_key(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Content-derived keys: the same input parts always produce the same key.
///
/// Lets callers check `find` for an in-flight duplicate before submitting
/// (e.g. the same url and target path).
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestKeys;

impl DigestKeys {
    /// SHA-256 hex digest of the parts, each terminated by a NUL separator
    pub fn key_for(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_keys_unique() {
        let keys = UuidKeys;
        assert_ne!(keys.next_key(), keys.next_key());
    }

    #[test]
    fn test_sequential_keys() {
        let keys = SequentialKeys::starting_at(5);
        assert_eq!(keys.next_key(), 5);
        assert_eq!(keys.next_key(), 6);
    }

    #[test]
    fn test_digest_keys_stable() {
        let a = DigestKeys::key_for(&["http://host/file.mp3", "/tmp/file.mp3"]);
        let b = DigestKeys::key_for(&["http://host/file.mp3", "/tmp/file.mp3"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_keys_separate_parts() {
        assert_ne!(DigestKeys::key_for(&["ab", "c"]), DigestKeys::key_for(&["a", "bc"]));
    }
}
