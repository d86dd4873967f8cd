//! Ed25519 wallet key generation.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{decode_base64_array, encode_base64};
use crate::CryptoError;

/// A wallet key pair, base64 encoded the way it is persisted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletKeys {
    pub public_key_base64: String,
    pub secret_key_base64: String,
}

/// Generate a new Ed25519 wallet key pair from the OS random source.
pub fn generate_wallet_keys() -> WalletKeys {
    let signing_key = SigningKey::generate(&mut OsRng);
    WalletKeys {
        public_key_base64: encode_base64(signing_key.verifying_key().as_bytes()),
        secret_key_base64: encode_base64(&signing_key.to_bytes()),
    }
}

/// Derive the base64 public key from a base64 secret key.
pub fn public_from_secret(secret_key_base64: &str) -> Result<String, CryptoError> {
    let signing_key = signing_key_from_base64(secret_key_base64)?;
    Ok(encode_base64(signing_key.verifying_key().as_bytes()))
}

pub(crate) fn signing_key_from_base64(secret_key_base64: &str) -> Result<SigningKey, CryptoError> {
    let mut seed = decode_base64_array::<32>(secret_key_base64)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(key)
}
