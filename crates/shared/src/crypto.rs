//! Hashing utilities for admin API key verification.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a presented API key against the configured SHA-256 hex digest.
///
/// The comparison runs over the full digest regardless of where the first
/// mismatch occurs. An empty expected hash never matches.
pub fn verify_api_key(candidate: &str, expected_hash: &str) -> bool {
    let expected = expected_hash.trim().to_ascii_lowercase();
    if expected.is_empty() {
        return false;
    }

    let actual = sha256_hex(candidate);
    if actual.len() != expected.len() {
        return false;
    }

    actual
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_unicode() {
        let hash = sha256_hex("গোয়াইনঘাট");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, sha256_hex("জৈন্তাপুর"));
    }

    #[test]
    fn test_verify_api_key_matches() {
        let hash = sha256_hex("admin-secret");
        assert!(verify_api_key("admin-secret", &hash));
    }

    #[test]
    fn test_verify_api_key_accepts_uppercase_hash() {
        let hash = sha256_hex("admin-secret").to_uppercase();
        assert!(verify_api_key("admin-secret", &hash));
    }

    #[test]
    fn test_verify_api_key_rejects_wrong_key() {
        let hash = sha256_hex("admin-secret");
        assert!(!verify_api_key("admin-secreT", &hash));
        assert!(!verify_api_key("", &hash));
    }

    #[test]
    fn test_verify_api_key_rejects_empty_or_truncated_hash() {
        assert!(!verify_api_key("anything", ""));
        assert!(!verify_api_key("anything", "   "));
        let hash = sha256_hex("anything");
        assert!(!verify_api_key("anything", &hash[..32]));
    }
}
