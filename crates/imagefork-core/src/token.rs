//! Token hashing.
//!
//! Client tokens are opaque and never stored verbatim. Every store and cache
//! is keyed by the SHA-256 digest of the token, hex encoded.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest.
pub const TOKEN_HASH_LEN: usize = 64;

/// Hex digest of a client token, used as the primary key of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hash a raw token. Accepts any string, including the empty one.
    #[must_use]
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already computed digest (e.g. read back from storage).
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TokenHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(TokenHash::of("abc"), TokenHash::of("abc"));
    }

    #[test]
    fn test_distinct_tokens_hash_differently() {
        assert_ne!(TokenHash::of("abc"), TokenHash::of("abd"));
        assert_ne!(TokenHash::of(""), TokenHash::of(" "));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            TokenHash::of("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fixed_length_for_any_input() {
        assert_eq!(TokenHash::of("").as_str().len(), TOKEN_HASH_LEN);
        let long = "x".repeat(100_000);
        let hash = TokenHash::of(&long);
        assert_eq!(hash.as_str().len(), TOKEN_HASH_LEN);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
