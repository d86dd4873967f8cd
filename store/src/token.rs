//! Spendable token storage trait.

use crate::StoreError;
use bat_types::TokenId;

/// Persistent set of spendable unblinded tokens, keyed by token id.
pub trait TokenStore: Send + Sync {
    fn put_token(&self, id: &TokenId, token_bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove a token. Returns whether it was present.
    fn delete_token(&self, id: &TokenId) -> Result<bool, StoreError>;

    /// All stored tokens, in key order.
    fn iter_tokens(&self) -> Result<Vec<(TokenId, Vec<u8>)>, StoreError>;

    fn token_count(&self) -> Result<u64, StoreError>;
}
