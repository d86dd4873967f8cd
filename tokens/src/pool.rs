//! The spendable token pool.
//!
//! Tokens are either spendable (persisted in the [`TokenStore`]) or in
//! flight (taken by a confirmation, already deleted from the store). A token
//! is never in both sets; every transition happens under one mutex.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use bat_store::TokenStore;
use bat_types::TokenId;

use crate::{TokenError, UnblindedToken};

#[derive(Default)]
struct PoolState {
    spendable: VecDeque<UnblindedToken>,
    /// Taken tokens awaiting burn, with the issuer key that signed them.
    in_flight: HashMap<TokenId, String>,
}

pub struct TokenPool {
    store: Arc<dyn TokenStore>,
    state: Mutex<PoolState>,
}

impl TokenPool {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            state: Mutex::new(PoolState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the spendable set with the store's contents.
    ///
    /// Records that fail to decode are deleted from the store and skipped.
    pub fn load(&self) -> Result<usize, TokenError> {
        let records = self.store.iter_tokens()?;
        let mut state = self.state();
        state.spendable.clear();
        for (id, bytes) in records {
            match UnblindedToken::from_bytes(&bytes) {
                Ok(token) if token.token_id == id => state.spendable.push_back(token),
                Ok(_) | Err(_) => {
                    tracing::warn!(token_id = %id, "discarding unreadable stored token");
                    self.store.delete_token(&id)?;
                }
            }
        }
        tracing::info!(count = state.spendable.len(), "loaded spendable tokens");
        Ok(state.spendable.len())
    }

    /// Persist and add tokens. Tokens already held (spendable or in flight)
    /// are skipped. Returns how many were added.
    pub fn add(&self, tokens: Vec<UnblindedToken>) -> Result<usize, TokenError> {
        let mut state = self.state();
        let mut added = 0;
        for token in tokens {
            let known = state.in_flight.contains_key(&token.token_id)
                || state.spendable.iter().any(|t| t.token_id == token.token_id);
            if known {
                continue;
            }
            self.store.put_token(&token.token_id, &token.to_bytes()?)?;
            state.spendable.push_back(token);
            added += 1;
        }
        Ok(added)
    }

    /// Move the oldest spendable token to the in-flight set.
    ///
    /// The token is deleted from the store before it is returned; if that
    /// fails it stays spendable.
    pub fn take(&self) -> Result<UnblindedToken, TokenError> {
        let mut state = self.state();
        let token = state.spendable.pop_front().ok_or(TokenError::PoolEmpty)?;
        if let Err(e) = self.store.delete_token(&token.token_id) {
            state.spendable.push_front(token);
            return Err(e.into());
        }
        state
            .in_flight
            .insert(token.token_id.clone(), token.public_key.clone());
        tracing::debug!(token_id = %token.token_id, "token taken");
        Ok(token)
    }

    /// Forget an in-flight token for good. Returns whether it was in flight.
    pub fn burn(&self, id: &TokenId) -> bool {
        self.state().in_flight.remove(id).is_some()
    }

    pub fn spendable_count(&self) -> usize {
        self.state().spendable.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state().in_flight.len()
    }

    pub fn is_ready(&self) -> bool {
        !self.state().spendable.is_empty()
    }

    pub fn is_spendable(&self, id: &TokenId) -> bool {
        self.state().spendable.iter().any(|t| &t.token_id == id)
    }

    pub fn is_in_flight(&self, id: &TokenId) -> bool {
        self.state().in_flight.contains_key(id)
    }

    /// Whether any spendable or in-flight token was signed with
    /// `public_key`. Issuers can be re-keyed under the same name, so the key
    /// is what ties a token to its issuer.
    pub fn has_tokens_for(&self, public_key: &str) -> bool {
        let state = self.state();
        state.spendable.iter().any(|t| t.public_key == public_key)
            || state.in_flight.values().any(|key| key == public_key)
    }
}
