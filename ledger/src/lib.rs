//! Wallet accounting.
//!
//! The [`TransactionLog`] is the append-only source of truth; the
//! [`WalletLedger`] folds it into a [`bat_types::Balance`] and guarantees
//! at-most-once accounting per transaction id. Balances only grow.

pub mod error;
pub mod log;
pub mod wallet;

pub use error::LedgerError;
pub use log::{TransactionIter, TransactionLog};
pub use wallet::{ApplyOutcome, WalletLedger};
