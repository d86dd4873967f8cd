//! LMDB implementation of TransactionStore.
//!
//! `transactions` maps id -> record bytes; `transaction_seq` maps the
//! big-endian sequence number -> id, so key order is insertion order.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use bat_store::{StoreError, TransactionStore};
use bat_types::TransactionId;

use crate::LmdbError;

pub struct LmdbTransactionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    pub(crate) seq_db: Database<Bytes, Bytes>,
}

impl TransactionStore for LmdbTransactionStore {
    fn append_transaction(&self, id: &TransactionId, tx_bytes: &[u8]) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = id.as_str().as_bytes();
        if self
            .transactions_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        let seq = self.seq_db.len(&wtxn).map_err(LmdbError::from)?;
        self.transactions_db
            .put(&mut wtxn, key, tx_bytes)
            .map_err(LmdbError::from)?;
        self.seq_db
            .put(&mut wtxn, &seq.to_be_bytes(), key)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(seq)
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .transactions_db
            .get(&rtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_by_sequence(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(id) = self
            .seq_db
            .get(&rtxn, &seq.to_be_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let val = self
            .transactions_db
            .get(&rtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                LmdbError::Inconsistent(format!("sequence {seq} points at a missing record"))
            })?;
        Ok(Some(val.to_vec()))
    }

    fn exists(&self, id: &TransactionId) -> Result<bool, StoreError> {
        Ok(self.get_transaction(id)?.is_some())
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.seq_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DEFAULT_MAP_SIZE;
    use crate::LmdbEnvironment;

    fn open() -> (tempfile::TempDir, LmdbTransactionStore) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        let store = env.transaction_store();
        (dir, store)
    }

    #[test]
    fn append_assigns_dense_sequence() {
        let (_dir, store) = open();
        assert_eq!(store.append_transaction(&"a".into(), b"A").unwrap(), 0);
        assert_eq!(store.append_transaction(&"b".into(), b"B").unwrap(), 1);
        assert_eq!(store.get_by_sequence(0).unwrap().unwrap(), b"A");
        assert_eq!(store.get_by_sequence(1).unwrap().unwrap(), b"B");
        assert!(store.get_by_sequence(2).unwrap().is_none());
    }

    #[test]
    fn duplicate_append_leaves_store_unchanged() {
        let (_dir, store) = open();
        store.append_transaction(&"a".into(), b"first").unwrap();
        let err = store.append_transaction(&"a".into(), b"second").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.transaction_count().unwrap(), 1);
        assert_eq!(
            store.get_transaction(&"a".into()).unwrap().unwrap(),
            b"first"
        );
    }

    #[test]
    fn exists_reports_membership() {
        let (_dir, store) = open();
        assert!(!store.exists(&"x".into()).unwrap());
        store.append_transaction(&"x".into(), b"X").unwrap();
        assert!(store.exists(&"x".into()).unwrap());
    }

    #[test]
    fn sequence_order_survives_more_than_256_records() {
        let (_dir, store) = open();
        for i in 0..300u32 {
            store
                .append_transaction(&TransactionId::new(format!("tx-{i}")), &i.to_be_bytes())
                .unwrap();
        }
        let last = store.get_by_sequence(299).unwrap().unwrap();
        assert_eq!(last, 299u32.to_be_bytes());
    }
}
