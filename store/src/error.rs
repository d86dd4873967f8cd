use thiserror::Error;

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this key already exists in an append-only table.
    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend holds data it cannot interpret (dangling index, bad key).
    #[error("stored data is corrupt: {0}")]
    Corruption(String),
}
