//! LMDB implementation of WalletStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use bat_store::{StoreError, WalletStore};

use crate::LmdbError;

const WALLET_KEY: &[u8] = b"wallet";

pub struct LmdbWalletStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl WalletStore for LmdbWalletStore {
    fn put_wallet(&self, wallet_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, WALLET_KEY, wallet_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_wallet(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, WALLET_KEY)
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DEFAULT_MAP_SIZE;
    use crate::LmdbEnvironment;

    #[test]
    fn wallet_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        let store = env.wallet_store();
        assert!(store.get_wallet().unwrap().is_none());
        store.put_wallet(b"w1").unwrap();
        store.put_wallet(b"w2").unwrap();
        assert_eq!(store.get_wallet().unwrap().unwrap(), b"w2");
    }
}
