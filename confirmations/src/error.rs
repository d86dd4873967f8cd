use thiserror::Error;

use bat_crypto::CryptoError;
use bat_issuers::IssuerError;
use bat_ledger::LedgerError;
use bat_store::StoreError;
use bat_tokens::TokenError;

use crate::config::ConfigError;
use crate::state::ProtocolState;

#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("network timeout")]
    NetworkTimeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("confirmation rejected: {0}")]
    Rejected(String),

    #[error("issuer {0} is revoked or expired")]
    RevokedIssuer(String),

    #[error("invalid wallet: {0}")]
    InvalidWallet(String),

    #[error("no active issuers")]
    NoIssuers,

    #[error("failed after {attempts} attempt(s): {reason}")]
    Failed { attempts: u32, reason: String },

    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: ProtocolState,
        to: ProtocolState,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Issuer(#[from] IssuerError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConfirmationError {
    /// Whether repeating the same exchange may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkTimeout | Self::Transport(_))
    }
}
