//! Ed25519 request signing with the wallet key.

use ed25519_dalek::{Signer, VerifyingKey};

use crate::encoding::{decode_base64_array, encode_base64};
use crate::keys::signing_key_from_base64;
use crate::CryptoError;

/// Sign `message` with the wallet secret key, returning a base64 signature.
pub fn sign_request(message: &[u8], secret_key_base64: &str) -> Result<String, CryptoError> {
    let signing_key = signing_key_from_base64(secret_key_base64)?;
    Ok(encode_base64(&signing_key.sign(message).to_bytes()))
}

/// Verify a base64 signature against a message and base64 public key.
///
/// Rejects non-canonical signatures.
pub fn verify_request(message: &[u8], signature_base64: &str, public_key_base64: &str) -> bool {
    let Ok(public) = decode_base64_array::<32>(public_key_base64) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public) else {
        return false;
    };
    let Ok(sig) = decode_base64_array::<64>(signature_base64) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig);
    verifying_key.verify_strict(message, &sig).is_ok()
}
