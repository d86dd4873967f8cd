//! Fundamental types for the BAT ad-confirmation protocol.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: amounts, timestamps, identifiers, issuers, wallets,
//! promotions, transactions and the derived balance.

pub mod amount;
pub mod confirmation;
pub mod environment;
pub mod error;
pub mod ids;
pub mod issuer;
pub mod time;
pub mod transaction;
pub mod wallet;

pub use amount::Amount;
pub use confirmation::ConfirmationType;
pub use environment::Environment;
pub use error::TypesError;
pub use ids::{ConfirmationId, CreativeInstanceId, PaymentId, PromotionId, TokenId, TransactionId};
pub use issuer::{Issuer, IssuerSet};
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{Balance, Promotion, Transaction, TransactionKind};
pub use wallet::Wallet;
