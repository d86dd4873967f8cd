//! Transaction storage trait.

use crate::StoreError;
use bat_types::TransactionId;

/// Append-only transaction records with an insertion-order index.
///
/// Sequence numbers start at 0 and are dense: the n-th successful append
/// gets sequence `n`.
pub trait TransactionStore: Send + Sync {
    /// Atomically check for `id` and append `tx_bytes` under the next sequence
    /// number. Fails with [`StoreError::Duplicate`] if `id` is already stored,
    /// leaving the store unchanged.
    fn append_transaction(&self, id: &TransactionId, tx_bytes: &[u8]) -> Result<u64, StoreError>;

    /// Retrieve a transaction by id.
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Retrieve the transaction appended at `seq`.
    fn get_by_sequence(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError>;

    /// Check if a transaction exists.
    fn exists(&self, id: &TransactionId) -> Result<bool, StoreError>;

    /// Number of stored transactions (also the next sequence number).
    fn transaction_count(&self) -> Result<u64, StoreError>;
}
