//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod url;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a string.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
