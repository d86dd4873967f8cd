//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, LmdbTokenStore, LmdbTransactionStore, LmdbWalletStore};

/// Default map size: 64 MiB is far more than a client token ledger needs.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    transactions_db: Database<Bytes, Bytes>,
    transaction_seq_db: Database<Bytes, Bytes>,
    tokens_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Directory {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // SAFETY: the environment is opened once per process for this
        // directory and never concurrently mapped by another `Env`.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let transactions_db = env.create_database(&mut wtxn, Some("transactions"))?;
        let transaction_seq_db = env.create_database(&mut wtxn, Some("transaction_seq"))?;
        let tokens_db = env.create_database(&mut wtxn, Some("tokens"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            transactions_db,
            transaction_seq_db,
            tokens_db,
            meta_db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transaction_store(&self) -> LmdbTransactionStore {
        LmdbTransactionStore {
            env: Arc::clone(&self.env),
            transactions_db: self.transactions_db,
            seq_db: self.transaction_seq_db,
        }
    }

    pub fn token_store(&self) -> LmdbTokenStore {
        LmdbTokenStore {
            env: Arc::clone(&self.env),
            tokens_db: self.tokens_db,
        }
    }

    pub fn wallet_store(&self) -> LmdbWalletStore {
        LmdbWalletStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
