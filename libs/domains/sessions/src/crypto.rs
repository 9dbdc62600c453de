//! Hashing and randomness helpers.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256, the at-rest form of refresh tokens and OTP codes.
pub fn sha256_hex(input: &str) -> String {
    const_hex::encode(Sha256::digest(input.as_bytes()))
}

/// Unpadded URL-safe base64 SHA-256, used inside store keys.
pub fn sha256_url(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(input.as_bytes()))
}

/// `bytes` of OS-seeded randomness, unpadded URL-safe base64.
pub fn random_url_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_url_is_unpadded() {
        let hashed = sha256_url("abc");
        assert_eq!(hashed.len(), 43);
        assert!(!hashed.contains('='));
        assert!(!hashed.contains('+') && !hashed.contains('/'));
    }

    #[test]
    fn test_random_url_token_length_and_uniqueness() {
        let a = random_url_token(64);
        let b = random_url_token(64);
        // 64 bytes -> ceil(64 * 4 / 3) characters without padding
        assert_eq!(a.len(), 86);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("123456", "123456"));
        assert!(!constant_time_eq("123456", "123457"));
        assert!(!constant_time_eq("123456", "12345"));
    }
}
