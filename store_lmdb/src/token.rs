//! LMDB implementation of TokenStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use bat_store::{StoreError, TokenStore};
use bat_types::TokenId;

use crate::LmdbError;

pub struct LmdbTokenStore {
    pub(crate) env: Arc<Env>,
    pub(crate) tokens_db: Database<Bytes, Bytes>,
}

impl TokenStore for LmdbTokenStore {
    fn put_token(&self, id: &TokenId, token_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.tokens_db
            .put(&mut wtxn, id.as_str().as_bytes(), token_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_token(&self, id: &TokenId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existed = self
            .tokens_db
            .delete(&mut wtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(existed)
    }

    fn iter_tokens(&self) -> Result<Vec<(TokenId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut tokens = Vec::new();
        let iter = self.tokens_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            let key_str =
                std::str::from_utf8(key).map_err(|e| LmdbError::Inconsistent(e.to_string()))?;
            tokens.push((TokenId::new(key_str), val.to_vec()));
        }
        Ok(tokens)
    }

    fn token_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.tokens_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DEFAULT_MAP_SIZE;
    use crate::LmdbEnvironment;

    #[test]
    fn put_iter_delete() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        let store = env.token_store();

        store.put_token(&"b".into(), b"B").unwrap();
        store.put_token(&"a".into(), b"A").unwrap();
        let all = store.iter_tokens().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, TokenId::new("a"));

        assert!(store.delete_token(&"a".into()).unwrap());
        assert!(!store.delete_token(&"a".into()).unwrap());
        assert_eq!(store.token_count().unwrap(), 1);
    }
}
