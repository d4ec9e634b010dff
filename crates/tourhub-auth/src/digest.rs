//! SHA-256 digests for token and secret storage.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of the input.
///
/// Tokens and refresh secrets are only ever stored and looked up in
/// this form; plaintext never reaches the database.
pub(crate) fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_distinct_inputs_distinct_digests() {
        assert_ne!(sha256_hex("token-a"), sha256_hex("token-b"));
    }
}
