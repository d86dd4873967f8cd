//! Thread-safe in-memory stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bat_store::{StoreError, TokenStore, TransactionStore, WalletStore};
use bat_types::{TokenId, TransactionId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct TransactionTables {
    by_id: HashMap<TransactionId, Vec<u8>>,
    by_seq: Vec<TransactionId>,
}

/// An append-only in-memory transaction store.
#[derive(Default)]
pub struct NullTransactionStore {
    tables: Mutex<TransactionTables>,
}

impl NullTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for NullTransactionStore {
    fn append_transaction(&self, id: &TransactionId, tx_bytes: &[u8]) -> Result<u64, StoreError> {
        let mut tables = lock(&self.tables);
        if tables.by_id.contains_key(id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        tables.by_id.insert(id.clone(), tx_bytes.to_vec());
        tables.by_seq.push(id.clone());
        Ok(tables.by_seq.len() as u64 - 1)
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.tables).by_id.get(id).cloned())
    }

    fn get_by_sequence(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError> {
        let tables = lock(&self.tables);
        Ok(usize::try_from(seq)
            .ok()
            .and_then(|i| tables.by_seq.get(i))
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    fn exists(&self, id: &TransactionId) -> Result<bool, StoreError> {
        Ok(lock(&self.tables).by_id.contains_key(id))
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.tables).by_seq.len() as u64)
    }
}

/// An in-memory token store whose writes can be made to fail.
#[derive(Default)]
pub struct NullTokenStore {
    tokens: Mutex<BTreeMap<TokenId, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl NullTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, `put_token` and `delete_token` return a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }
}

impl TokenStore for NullTokenStore {
    fn put_token(&self, id: &TokenId, token_bytes: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.tokens).insert(id.clone(), token_bytes.to_vec());
        Ok(())
    }

    fn delete_token(&self, id: &TokenId) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(lock(&self.tokens).remove(id).is_some())
    }

    fn iter_tokens(&self) -> Result<Vec<(TokenId, Vec<u8>)>, StoreError> {
        Ok(lock(&self.tokens)
            .iter()
            .map(|(id, bytes)| (id.clone(), bytes.clone()))
            .collect())
    }

    fn token_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.tokens).len() as u64)
    }
}

/// An in-memory single-slot wallet store.
#[derive(Default)]
pub struct NullWalletStore {
    wallet: Mutex<Option<Vec<u8>>>,
}

impl NullWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for NullWalletStore {
    fn put_wallet(&self, wallet_bytes: &[u8]) -> Result<(), StoreError> {
        *lock(&self.wallet) = Some(wallet_bytes.to_vec());
        Ok(())
    }

    fn get_wallet(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.wallet).clone())
    }
}
