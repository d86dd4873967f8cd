//! The anonymous ad-confirmation protocol.
//!
//! [`Confirmations`] keeps a pool of blind-signed tokens topped up from the
//! issuer, spends one token per ad event without revealing the wallet, and
//! records every redemption and promotion in the wallet ledger.
//!
//! Network access and the embedding application are injected through
//! [`ConfirmationsEndpoint`] and [`ConfirmationsDelegate`].

pub mod config;
pub mod delegate;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod protocol;
pub mod state;
pub mod stats;

mod redeem;
mod refill;

pub use config::{ConfigError, ConfirmationsConfig};
pub use delegate::{ConfirmationsDelegate, LoggingDelegate, NoopDelegate};
pub use endpoint::{
    ConfirmationPayload, ConfirmationResponse, ConfirmationsEndpoint, RedemptionStatus,
    RefillRequest, SignedTokenEntry, SignedTokensRequest, SignedTokensResponse,
};
pub use error::ConfirmationError;
pub use http::HttpEndpoint;
pub use protocol::{Collaborators, Confirmations, RefillOutcome, Status};
pub use state::{ConfirmationMachine, ProtocolState};
pub use stats::{Counter, ProtocolStats};
