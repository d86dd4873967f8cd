use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The random source or a blinding primitive failed.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// A signed token does not verify against the expected issuer key.
    #[error("signature does not match issuer key")]
    SignatureMismatch,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
