//! Tokens: generation, unblinding and the spendable pool.
//!
//! Lifecycle: [`TokenGenerator`] produces a [`BlindedToken`] (sent to the
//! issuer) paired with a [`PendingToken`] (kept locally). A verified issuer
//! signature turns the pending token into an [`UnblindedToken`], which lives
//! in the [`TokenPool`] until a confirmation takes it.

pub mod error;
pub mod generator;
pub mod pool;
pub mod token;

pub use error::TokenError;
pub use generator::TokenGenerator;
pub use pool::TokenPool;
pub use token::{BlindedToken, PendingToken, UnblindedToken};
