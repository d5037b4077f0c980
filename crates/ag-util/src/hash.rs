// hash.rs — SHA-256 hashing for the audit chain.
//
// Every hash in the governance engine is SHA-256, hex-encoded. SHA-256
// produces a 32-byte digest; we encode it as a 64-character lowercase hex
// string for readability and JSON compatibility.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
///
/// This is deterministic: the same input always produces the same output.
pub fn sha256_hex_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    // `format!("{:x}", ...)` produces lowercase hex
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 string.
pub fn sha256_hex(s: &str) -> String {
    sha256_hex_bytes(s.as_bytes())
}
