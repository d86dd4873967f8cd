//! The append-only transaction log.

use std::sync::Arc;

use bat_store::{StoreError, TransactionStore};
use bat_types::{Timestamp, Transaction, TransactionId};

use crate::LedgerError;

fn encode(tx: &Transaction) -> Result<Vec<u8>, LedgerError> {
    bincode::serialize(tx).map_err(|e| LedgerError::Encoding(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Transaction, LedgerError> {
    bincode::deserialize(bytes).map_err(|e| LedgerError::Encoding(e.to_string()))
}

/// Ordered, unique-by-id record of settled transactions.
#[derive(Clone)]
pub struct TransactionLog {
    store: Arc<dyn TransactionStore>,
}

impl TransactionLog {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Append `tx`, returning its sequence number.
    ///
    /// A second append with the same transaction id fails with
    /// [`LedgerError::DuplicateTransaction`] and changes nothing.
    pub fn append(&self, tx: &Transaction) -> Result<u64, LedgerError> {
        let bytes = encode(tx)?;
        match self.store.append_transaction(&tx.transaction_id, &bytes) {
            Ok(seq) => Ok(seq),
            Err(StoreError::Duplicate(_)) => Err(LedgerError::DuplicateTransaction(
                tx.transaction_id.to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: &TransactionId) -> Result<Option<Transaction>, LedgerError> {
        self.store
            .get_transaction(id)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn contains(&self, id: &TransactionId) -> Result<bool, LedgerError> {
        Ok(self.store.exists(id)?)
    }

    pub fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.store.transaction_count()?)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Lazily iterate in insertion order, one record read per step.
    ///
    /// Records appended while iterating are picked up.
    pub fn iter(&self) -> TransactionIter {
        TransactionIter {
            store: Arc::clone(&self.store),
            next_seq: 0,
        }
    }

    /// Transactions with `from <= timestamp <= to`, in insertion order.
    pub fn history(&self, from: Timestamp, to: Timestamp) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for tx in self.iter() {
            let tx = tx?;
            if tx.timestamp >= from && tx.timestamp <= to {
                out.push(tx);
            }
        }
        Ok(out)
    }
}

/// Cursor over a [`TransactionLog`].
pub struct TransactionIter {
    store: Arc<dyn TransactionStore>,
    next_seq: u64,
}

impl TransactionIter {
    /// Rewind to the first record.
    pub fn restart(&mut self) {
        self.next_seq = 0;
    }

    pub fn position(&self) -> u64 {
        self.next_seq
    }
}

impl Iterator for TransactionIter {
    type Item = Result<Transaction, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.store.get_by_sequence(self.next_seq) {
            Ok(Some(bytes)) => decode(&bytes),
            Ok(None) => return None,
            Err(e) => Err(e.into()),
        };
        self.next_seq += 1;
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_nullables::NullTransactionStore;
    use bat_types::{Amount, ConfirmationType};

    fn tx(id: &str, ts: u64) -> Transaction {
        Transaction::redemption(
            TransactionId::new(id),
            Amount::from_bat(1),
            ConfirmationType::View,
            Timestamp::new(ts),
        )
    }

    fn log() -> TransactionLog {
        TransactionLog::new(Arc::new(NullTransactionStore::new()))
    }

    #[test]
    fn append_and_iterate_in_order() {
        let log = log();
        for (i, id) in ["c", "a", "b"].iter().enumerate() {
            assert_eq!(log.append(&tx(id, i as u64)).unwrap(), i as u64);
        }
        let ids: Vec<_> = log
            .iter()
            .map(|t| t.unwrap().transaction_id.to_string())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn duplicate_append_rejected() {
        let log = log();
        log.append(&tx("a", 1)).unwrap();
        assert!(matches!(
            log.append(&tx("a", 2)),
            Err(LedgerError::DuplicateTransaction(_))
        ));
        assert_eq!(log.len().unwrap(), 1);
        assert_eq!(log.get(&"a".into()).unwrap().unwrap().timestamp, Timestamp::new(1));
    }

    #[test]
    fn iterator_is_lazy_and_restartable() {
        let log = log();
        log.append(&tx("a", 1)).unwrap();
        let mut iter = log.iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());

        log.append(&tx("b", 2)).unwrap();
        assert_eq!(iter.next().unwrap().unwrap().transaction_id.as_str(), "b");

        iter.restart();
        assert_eq!(iter.position(), 0);
        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn history_range_is_inclusive() {
        let log = log();
        for (id, ts) in [("a", 10), ("b", 20), ("c", 30)] {
            log.append(&tx(id, ts)).unwrap();
        }
        let got = log.history(Timestamp::new(10), Timestamp::new(20)).unwrap();
        assert_eq!(got.len(), 2);
        assert!(log
            .history(Timestamp::new(31), Timestamp::MAX)
            .unwrap()
            .is_empty());
    }
}
