use bat_crypto::CryptoError;
use bat_store::StoreError;
use bat_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no spendable tokens")]
    PoolEmpty,

    #[error("invalid issuer: {0}")]
    Issuer(#[from] TypesError),

    #[error("token encoding error: {0}")]
    Encoding(String),
}
