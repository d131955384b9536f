//! Content fingerprints for compiler output chunks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque fingerprint of a chunk payload.
///
/// Hashes are supplied by the external compiler and compared only for
/// equality: two chunks of the same name with equal hashes are assumed to
/// carry identical data. The payload is never re-hashed to verify this.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps an externally supplied hash token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Computes an XXH3-128 fingerprint of `data` as 32 lowercase hex chars.
    ///
    /// For producers that mint their own hashes (synthetic outputs, tests).
    pub fn of(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(format!("{hash:032x}"))
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.0.chars().take(8).collect();
        if short.len() < self.0.len() {
            write!(f, "ContentHash({short}..)")
        } else {
            write!(f, "ContentHash({short})")
        }
    }
}

impl From<&str> for ContentHash {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ContentHash {
    fn from(token: String) -> Self {
        Self(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::of(b"hello world");
        let b = ContentHash::of(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::of(b"hello");
        let b = ContentHash::of(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn computed_hash_is_hex() {
        let h = ContentHash::of(b"test");
        let s = h.to_string();
        assert_eq!(s.len(), 32, "Display should be 32 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn external_tokens_compare_verbatim() {
        assert_eq!(ContentHash::new("abc"), ContentHash::from("abc"));
        assert_ne!(ContentHash::new("abc"), ContentHash::new("ABC"));
    }

    #[test]
    fn debug_abbreviated() {
        let h = ContentHash::new("0123456789abcdef");
        assert_eq!(format!("{h:?}"), "ContentHash(01234567..)");
        let short = ContentHash::new("ab");
        assert_eq!(format!("{short:?}"), "ContentHash(ab)");
    }

    #[test]
    fn serializes_as_plain_string() {
        let h = ContentHash::new("h-1");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"h-1\"");
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
