//! Cryptographic primitives for BAT confirmations.
//!
//! - **Ristretto255 VOPRF** for blind token issuance (privacy-pass style)
//! - **Chaum-Pedersen DLEQ** proofs binding each signed token to the issuer key
//! - **HMAC-SHA512** redemption signatures keyed by the unblinded token
//! - **Ed25519** for authenticating token refill requests with the wallet key
//! - **Blake2b** for client-generated token ids

pub mod dleq;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod issuer_key;
pub mod keys;
pub mod redemption;
pub mod sign;
pub mod token;

pub use dleq::DleqProof;
pub use encoding::{decode_base64, decode_base64_array, encode_base64};
pub use error::CryptoError;
pub use hash::{blake2b_256, request_digest, token_id_hex};
pub use issuer_key::{IssuerPublicKey, IssuerSecretKey};
pub use keys::{generate_wallet_keys, public_from_secret, WalletKeys};
pub use redemption::{RedemptionSignature, VerificationKey};
pub use sign::{sign_request, verify_request};
pub use token::{BlindedPoint, BlindingToken, SignedPoint, TokenPreimage, UnblindedSignature};

/// A cryptographically secure random source usable behind a trait object.
pub trait SecureRandom: rand::RngCore + rand::CryptoRng + Send {}

impl<T: rand::RngCore + rand::CryptoRng + Send> SecureRandom for T {}
