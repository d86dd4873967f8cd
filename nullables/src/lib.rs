//! Test doubles for the confirmations protocol.
//!
//! The protocol reaches the outside world only through traits: the clock,
//! the issuer service, the three stores, the random source and the
//! delegate. This crate implements each of them in memory, with knobs to
//! script faults, so scenario tests run deterministically and offline.

pub mod clock;
pub mod delegate;
pub mod issuer;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use delegate::{DelegateEvent, RecordingDelegate};
pub use issuer::NullIssuer;
pub use random::FailingRandom;
pub use store::{NullTokenStore, NullTransactionStore, NullWalletStore};
