use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssuerError {
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("a catalog refresh is already in progress")]
    RefreshInProgress,
}
