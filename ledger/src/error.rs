use bat_types::TransactionKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("balance overflow")]
    Overflow,

    #[error("expected a {expected:?} transaction, got {got:?}")]
    WrongKind {
        expected: TransactionKind,
        got: TransactionKind,
    },

    #[error("transaction encoding error: {0}")]
    Encoding(String),

    #[error("storage error: {0}")]
    Store(#[from] bat_store::StoreError),
}
