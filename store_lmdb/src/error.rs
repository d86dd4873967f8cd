use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("could not prepare data directory {path}: {reason}")]
    Directory { path: String, reason: String },

    /// Keys or indexes that do not decode, or point nowhere.
    #[error("inconsistent record: {0}")]
    Inconsistent(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for bat_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Inconsistent(msg) => bat_store::StoreError::Corruption(msg),
            other => bat_store::StoreError::Backend(other.to_string()),
        }
    }
}
