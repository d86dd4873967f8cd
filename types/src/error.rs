//! Parse and validation errors for the shared value types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount overflow")]
    AmountOverflow,

    #[error("unknown confirmation type: {0}")]
    UnknownConfirmationType(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("issuer name does not carry a denomination: {0}")]
    InvalidDenomination(String),
}
