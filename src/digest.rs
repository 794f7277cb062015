//! SHA-256 helpers shared by the login hash and store key derivation.

use sha2::{Digest, Sha256};

/// Lowercase hex encoding of `bytes`.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// SHA-256 of `input`, as lowercase hex.
pub(crate) fn sha256_hex(input: &str) -> String {
    hex_encode(&Sha256::digest(input.as_bytes()))
}

/// Raw 32-byte SHA-256 of `input`.
pub(crate) fn sha256_bytes(input: &str) -> [u8; 32] {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = [0_u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}
