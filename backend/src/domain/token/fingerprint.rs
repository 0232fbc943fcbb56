//! Signing secret fingerprinting for operational visibility.
//!
//! A truncated SHA-256 digest of the secret lets operators tell which key
//! signed a token without the key material ever reaching a log line.

use sha2::{Digest, Sha256};

/// Length of the fingerprint in bytes before hex encoding.
const FINGERPRINT_BYTES: usize = 8;

/// Generate a truncated SHA-256 fingerprint of a signing secret.
///
/// # Examples
///
/// ```rust
/// use expense_tracker::domain::key_fingerprint;
///
/// let fp = key_fingerprint(&[b'a'; 32]);
/// assert_eq!(fp.len(), 16);
/// assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn key_fingerprint(secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    let result = hasher.finalize();
    hex::encode(&result[..FINGERPRINT_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fingerprint_is_deterministic() {
        assert_eq!(key_fingerprint(b"secret"), key_fingerprint(b"secret"));
    }

    #[rstest]
    fn fingerprint_is_lowercase_hex_of_fixed_length() {
        let fp = key_fingerprint(&[7_u8; 64]);
        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert_eq!(fp, fp.to_lowercase());
    }

    #[rstest]
    fn different_secrets_produce_different_fingerprints() {
        assert_ne!(key_fingerprint(&[b'a'; 32]), key_fingerprint(&[b'b'; 32]));
    }
}
