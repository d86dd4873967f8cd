//! Wallet storage trait.

use crate::StoreError;

/// Holds the single serialized wallet of this client.
pub trait WalletStore: Send + Sync {
    fn put_wallet(&self, wallet_bytes: &[u8]) -> Result<(), StoreError>;

    fn get_wallet(&self) -> Result<Option<Vec<u8>>, StoreError>;
}
