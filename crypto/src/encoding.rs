//! Base64 helpers for wire encoding of keys, tokens and proofs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::CryptoError;

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(s: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError::Decode(format!("base64: {e}")))
}

/// Decode base64 into a fixed-size array, rejecting any other length.
pub fn decode_base64_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_base64(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decode(format!("expected {N} bytes, got {}", bytes.len())))
}
