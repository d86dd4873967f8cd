//! LMDB storage backend for BAT confirmations.
//!
//! Implements the storage traits from `bat-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.

pub mod environment;
pub mod error;
pub mod token;
pub mod transaction;
pub mod wallet;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use token::LmdbTokenStore;
pub use transaction::LmdbTransactionStore;
pub use wallet::LmdbWalletStore;
