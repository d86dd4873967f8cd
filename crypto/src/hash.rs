//! Blake2b-256 digests: token ids and refill request digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::encode_base64;

type Blake2b256 = Blake2b<U32>;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Blake2b256::digest(data));
    output
}

/// Lowercase hex digest of a token preimage. Client and issuer key tokens by it.
pub fn token_id_hex(preimage: &[u8]) -> String {
    hex::encode(blake2b_256(preimage))
}

/// The `digest` header value for a request body: `BLAKE2B-256=<base64>`.
pub fn request_digest(body: &[u8]) -> String {
    format!("BLAKE2B-256={}", encode_base64(&blake2b_256(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn token_ids_are_hex_and_distinct() {
        let a = token_id_hex(&[1u8; 64]);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, token_id_hex(&[2u8; 64]));
    }

    #[test]
    fn request_digest_format() {
        let digest = request_digest(b"{}");
        let encoded = digest.strip_prefix("BLAKE2B-256=").unwrap();
        assert_eq!(crate::decode_base64(encoded).unwrap(), blake2b_256(b"{}"));
    }
}
