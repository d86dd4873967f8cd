//! Abstract storage traits for BAT confirmations.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits. Values are
//! opaque serialized bytes; encoding is the caller's concern.

pub mod error;
pub mod token;
pub mod transaction;
pub mod wallet;

pub use error::StoreError;
pub use token::TokenStore;
pub use transaction::TransactionStore;
pub use wallet::WalletStore;
