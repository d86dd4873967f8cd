//! The confirmations client: wiring, lifecycle and queries.
//!
//! Refill and redemption live in `refill.rs` and `redeem.rs`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use bat_crypto::{public_from_secret, SecureRandom};
use bat_issuers::{parse_catalog, IssuerRegistry, UpdateSummary};
use bat_ledger::{TransactionLog, WalletLedger};
use bat_store::{TokenStore, TransactionStore, WalletStore};
use bat_tokens::{TokenGenerator, TokenPool};
use bat_types::{
    Balance, Clock, ConfirmationType, CreativeInstanceId, PaymentId, Promotion, Timestamp,
    Transaction, Wallet,
};

use crate::{
    ConfirmationError, ConfirmationsConfig, ConfirmationsDelegate, ConfirmationsEndpoint,
    ProtocolState, ProtocolStats,
};

/// Everything the protocol talks to, injected at construction.
pub struct Collaborators {
    pub endpoint: Arc<dyn ConfirmationsEndpoint>,
    pub delegate: Arc<dyn ConfirmationsDelegate>,
    pub transaction_store: Arc<dyn TransactionStore>,
    pub token_store: Arc<dyn TokenStore>,
    pub wallet_store: Arc<dyn WalletStore>,
    pub clock: Arc<dyn Clock>,
    pub random: Box<dyn SecureRandom>,
}

/// Result of a refill request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefillOutcome {
    /// At or above the low-water mark.
    NotNeeded { spendable: usize },
    /// Another refill holds the slot.
    AlreadyInProgress,
    Refilled {
        requested: usize,
        added: usize,
        discarded: usize,
    },
}

/// A point-in-time summary for status displays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub payment_id: Option<PaymentId>,
    pub ready: bool,
    pub spendable_tokens: usize,
    pub in_flight_tokens: usize,
    pub active_issuers: usize,
    pub retired_issuers: usize,
    pub refill_phase: ProtocolState,
    pub balance: Balance,
    pub transactions: u64,
}

/// Handle to the protocol. Cheap to clone; clones share state.
///
/// One instance owns the token pool of one wallet.
#[derive(Clone)]
pub struct Confirmations {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: ConfirmationsConfig,
    pub(crate) endpoint: Arc<dyn ConfirmationsEndpoint>,
    pub(crate) delegate: Arc<dyn ConfirmationsDelegate>,
    pub(crate) registry: IssuerRegistry,
    pub(crate) generator: TokenGenerator,
    pub(crate) pool: TokenPool,
    pub(crate) ledger: WalletLedger,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) refill_phase: Mutex<ProtocolState>,
    pub(crate) refill_slot: tokio::sync::Mutex<()>,
    pub(crate) stats: ProtocolStats,
    wallet_store: Arc<dyn WalletStore>,
    wallet: RwLock<Option<Wallet>>,
    ready: AtomicBool,
}

impl Confirmations {
    pub fn new(
        config: ConfirmationsConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ConfirmationError> {
        config.validate()?;
        let Collaborators {
            endpoint,
            delegate,
            transaction_store,
            token_store,
            wallet_store,
            clock,
            random,
        } = collaborators;
        let ledger = WalletLedger::open(TransactionLog::new(transaction_store), Arc::clone(&clock))?;
        let inner = Inner {
            config,
            endpoint,
            delegate,
            registry: IssuerRegistry::new(),
            generator: TokenGenerator::new(random),
            pool: TokenPool::new(token_store),
            ledger,
            clock,
            refill_phase: Mutex::new(ProtocolState::Idle),
            refill_slot: tokio::sync::Mutex::new(()),
            stats: ProtocolStats::default(),
            wallet_store,
            wallet: RwLock::new(None),
            ready: AtomicBool::new(false),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Load persisted state, refresh issuers and top up tokens.
    ///
    /// Catalog and refill failures are logged and left for the next trigger;
    /// only storage failures are returned.
    pub async fn start(&self) -> Result<Status, ConfirmationError> {
        self.load()?;
        let inner = &self.inner;
        if let Err(e) = self.refresh_catalog().await {
            tracing::warn!(error = %e, "catalog refresh failed, keeping previous issuers");
        }
        if inner.wallet().is_some() {
            if let Err(e) = self.refill_if_necessary().await {
                tracing::warn!(error = %e, "token refill failed, will retry on next trigger");
            }
        }
        let status = self.status()?;
        tracing::info!(
            spendable = status.spendable_tokens,
            issuers = status.active_issuers,
            ready = status.ready,
            "confirmations started"
        );
        Ok(status)
    }

    /// Load the stored wallet and tokens without touching the network.
    pub fn load(&self) -> Result<(), ConfirmationError> {
        let inner = &self.inner;
        if let Some(bytes) = inner.wallet_store.get_wallet()? {
            match serde_json::from_slice::<Wallet>(&bytes) {
                Ok(wallet) if wallet.is_valid() => inner.set_wallet_in_memory(wallet),
                _ => tracing::warn!("stored wallet is unusable, waiting for a new one"),
            }
        }
        inner.pool.load()?;
        inner.report_readiness();
        Ok(())
    }

    /// Validate, persist and adopt `wallet`.
    pub fn set_wallet(&self, wallet: Wallet) -> Result<(), ConfirmationError> {
        if !wallet.is_valid() {
            return Err(ConfirmationError::InvalidWallet("missing fields".into()));
        }
        let derived = public_from_secret(&wallet.secret_key_base64)
            .map_err(|e| ConfirmationError::InvalidWallet(e.to_string()))?;
        if derived != wallet.public_key_base64 {
            return Err(ConfirmationError::InvalidWallet(
                "public key does not match secret key".into(),
            ));
        }
        let bytes = serde_json::to_vec(&wallet)
            .map_err(|e| ConfirmationError::InvalidWallet(e.to_string()))?;
        self.inner.wallet_store.put_wallet(&bytes)?;
        tracing::info!(payment_id = %wallet.payment_id, "wallet set");
        self.inner.set_wallet_in_memory(wallet);
        Ok(())
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.inner.wallet()
    }

    /// Fetch the catalog and swap it in whole, then drop retired issuers
    /// that no longer back any token.
    pub async fn refresh_catalog(&self) -> Result<UpdateSummary, ConfirmationError> {
        let inner = &self.inner;
        let guard = inner.registry.begin_refresh()?;
        let body = inner.with_timeout(inner.endpoint.fetch_catalog()).await?;
        let summary = guard.apply(parse_catalog(&body)?)?;
        inner
            .registry
            .prune_retired(|issuer| inner.pool.has_tokens_for(&issuer.public_key));
        Ok(summary)
    }

    /// Refill up to the high-water mark if below the low-water mark.
    pub async fn refill_if_necessary(&self) -> Result<RefillOutcome, ConfirmationError> {
        self.inner.refill_if_necessary().await
    }

    /// Spend one token on an ad event and record the redemption.
    ///
    /// Once a token has been taken the exchange runs to completion on its
    /// own task, even if the returned future is dropped. With `auto_refill`
    /// set, a pool left below the low-water mark is topped up in the
    /// background.
    pub async fn confirm(
        &self,
        creative_instance_id: CreativeInstanceId,
        confirmation_type: ConfirmationType,
    ) -> Result<Transaction, ConfirmationError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.confirm(creative_instance_id, confirmation_type).await })
            .await
            .map_err(|e| ConfirmationError::Failed {
                attempts: 0,
                reason: format!("confirmation task ended abnormally: {e}"),
            })?
    }

    /// Credit a promotion grant. Retries with the same id credit nothing.
    pub fn apply_promotion(&self, promotion: &Promotion) -> Result<Transaction, ConfirmationError> {
        let before = self.inner.ledger.log().len()?;
        let tx = self.inner.ledger.apply_promotion(promotion)?;
        if self.inner.ledger.log().len()? > before {
            self.inner.delegate.on_transaction_history_changed();
        }
        Ok(tx)
    }

    pub fn balance(&self) -> Balance {
        self.inner.ledger.balance()
    }

    pub fn history(&self, from: Timestamp, to: Timestamp) -> Result<Vec<Transaction>, ConfirmationError> {
        Ok(self.inner.ledger.history(from, to)?)
    }

    /// Valued redemptions in the current calendar month.
    pub fn transactions_this_month(&self) -> Result<usize, ConfirmationError> {
        Ok(self
            .inner
            .ledger
            .transactions_this_month(self.inner.clock.now())?)
    }

    pub fn registry(&self) -> &IssuerRegistry {
        &self.inner.registry
    }

    pub fn pool(&self) -> &TokenPool {
        &self.inner.pool
    }

    pub fn refill_phase(&self) -> ProtocolState {
        *self
            .inner
            .refill_phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> &ProtocolStats {
        &self.inner.stats
    }

    pub fn status(&self) -> Result<Status, ConfirmationError> {
        let inner = &self.inner;
        let snapshot = inner.registry.snapshot();
        Ok(Status {
            payment_id: inner.wallet().map(|w| w.payment_id.clone()),
            ready: inner.pool.is_ready(),
            spendable_tokens: inner.pool.spendable_count(),
            in_flight_tokens: inner.pool.in_flight_count(),
            active_issuers: snapshot.active.len(),
            retired_issuers: snapshot.retired.len(),
            refill_phase: self.refill_phase(),
            balance: inner.ledger.balance(),
            transactions: inner.ledger.log().len()?,
        })
    }
}

impl Inner {
    pub(crate) fn wallet(&self) -> Option<Wallet> {
        self.wallet
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_wallet_in_memory(&self, wallet: Wallet) {
        *self.wallet.write().unwrap_or_else(PoisonError::into_inner) = Some(wallet);
    }

    /// Tell the delegate when the pool flips between empty and non-empty.
    pub(crate) fn report_readiness(&self) {
        let ready = self.pool.is_ready();
        if self.ready.swap(ready, Ordering::AcqRel) != ready {
            tracing::info!(ready, "token pool readiness changed");
            self.delegate.on_ready_changed(ready);
        }
    }

    /// Bound one network exchange by the configured request timeout.
    pub(crate) async fn with_timeout<T>(
        &self,
        exchange: impl Future<Output = Result<T, ConfirmationError>>,
    ) -> Result<T, ConfirmationError> {
        tokio::time::timeout(self.config.request_timeout(), exchange)
            .await
            .map_err(|_| ConfirmationError::NetworkTimeout)?
    }
}
