//! An in-process stand-in for the confirmations service.
//!
//! Signs blinded tokens with real issuer keys and verifies redemptions the
//! way the service does, so protocol tests exercise the full cryptography.
//! Faults are scripted per call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::OsRng;

use bat_confirmations::{
    ConfirmationError, ConfirmationPayload, ConfirmationsEndpoint, RedemptionStatus,
    RefillRequest, SignedTokenEntry, SignedTokensResponse,
};
use bat_crypto::{BlindedPoint, CryptoError, IssuerSecretKey, RedemptionSignature, TokenPreimage};
use bat_issuers::Catalog;
use bat_types::{ConfirmationId, Issuer, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement `counter` if positive; true when a scripted fault fires.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Default)]
pub struct NullIssuer {
    keys: Mutex<HashMap<String, IssuerSecretKey>>,
    /// Replaced keys; they no longer sign but still verify redemptions.
    retired_keys: Mutex<Vec<IssuerSecretKey>>,
    catalog: Mutex<Vec<Issuer>>,
    catalog_body: Mutex<Option<String>>,
    wallet_public_key: Mutex<Option<String>>,
    respond_as: Mutex<Option<String>>,
    refill_delay: Mutex<Option<Duration>>,

    failing_refills: AtomicU32,
    failing_submissions: AtomicU32,
    lost_replies: AtomicU32,
    wrong_key_signatures: AtomicU32,
    omitted_tokens: AtomicU32,
    reject_submissions: AtomicBool,

    spent: Mutex<HashMap<String, ConfirmationId>>,
    redeemed: Mutex<HashSet<ConfirmationId>>,
    submissions: Mutex<Vec<ConfirmationPayload>>,
    blinded_seen: Mutex<Vec<String>>,
    refill_calls: AtomicUsize,
    submission_calls: AtomicUsize,
}

impl NullIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key for `name` (or reuse its old one) and list it in the catalog.
    pub fn add_issuer(
        &self,
        name: &str,
        valid_from: Timestamp,
        valid_until: Timestamp,
    ) -> Result<Issuer, CryptoError> {
        let mut keys = lock(&self.keys);
        let key = match keys.remove(name) {
            Some(key) => key,
            None => IssuerSecretKey::generate(&mut OsRng)?,
        };
        let issuer = Issuer::new(name, key.public_key().to_base64(), valid_from, valid_until);
        keys.insert(name.to_string(), key);
        let mut catalog = lock(&self.catalog);
        catalog.retain(|i| i.name != name);
        catalog.push(issuer.clone());
        Ok(issuer)
    }

    /// List `name` under a fresh key. Tokens signed with the previous key
    /// still redeem.
    pub fn rotate_issuer(
        &self,
        name: &str,
        valid_from: Timestamp,
        valid_until: Timestamp,
    ) -> Result<Issuer, CryptoError> {
        let fresh = IssuerSecretKey::generate(&mut OsRng)?;
        let previous = lock(&self.keys).insert(name.to_string(), fresh);
        if let Some(old) = previous {
            lock(&self.retired_keys).push(old);
        }
        self.add_issuer(name, valid_from, valid_until)
    }

    /// Drop `name` from the catalog. Its key still verifies redemptions.
    pub fn remove_issuer(&self, name: &str) {
        lock(&self.catalog).retain(|i| i.name != name);
    }

    pub fn catalog(&self) -> Catalog {
        Catalog {
            issuers: lock(&self.catalog).clone(),
        }
    }

    /// Serve `body` verbatim from `fetch_catalog`, or the real catalog on `None`.
    pub fn set_catalog_body(&self, body: Option<String>) {
        *lock(&self.catalog_body) = body;
    }

    /// Refuse refills not signed by this wallet key.
    pub fn require_wallet(&self, public_key_base64: &str) {
        *lock(&self.wallet_public_key) = Some(public_key_base64.to_string());
    }

    /// Name `issuer` in refill responses regardless of what was asked for.
    pub fn respond_as(&self, issuer: &str) {
        *lock(&self.respond_as) = Some(issuer.to_string());
    }

    pub fn delay_refills(&self, delay: Duration) {
        *lock(&self.refill_delay) = Some(delay);
    }

    /// The next `n` refill calls time out.
    pub fn fail_next_refills(&self, n: u32) {
        self.failing_refills.store(n, Ordering::SeqCst);
    }

    /// The next `n` submissions time out before reaching the service.
    pub fn fail_next_submissions(&self, n: u32) {
        self.failing_submissions.store(n, Ordering::SeqCst);
    }

    /// The next `n` submissions are redeemed but the reply is lost.
    pub fn lose_next_replies(&self, n: u32) {
        self.lost_replies.store(n, Ordering::SeqCst);
    }

    /// Sign the next `n` tokens with a key outside the catalog.
    pub fn sign_next_with_wrong_key(&self, n: u32) {
        self.wrong_key_signatures.store(n, Ordering::SeqCst);
    }

    /// Leave the next `n` tokens out of refill responses.
    pub fn omit_next_tokens(&self, n: u32) {
        self.omitted_tokens.store(n, Ordering::SeqCst);
    }

    pub fn reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    pub fn refill_calls(&self) -> usize {
        self.refill_calls.load(Ordering::SeqCst)
    }

    pub fn submission_calls(&self) -> usize {
        self.submission_calls.load(Ordering::SeqCst)
    }

    pub fn redeemed_count(&self) -> usize {
        lock(&self.redeemed).len()
    }

    /// Every confirmation that reached the service, in arrival order.
    pub fn submissions(&self) -> Vec<ConfirmationPayload> {
        lock(&self.submissions).clone()
    }

    /// Every blinded value received across all refill calls.
    pub fn blinded_seen(&self) -> Vec<String> {
        lock(&self.blinded_seen).clone()
    }

    fn sign_all(&self, request: &RefillRequest) -> Result<SignedTokensResponse, ConfirmationError> {
        if let Some(public_key) = lock(&self.wallet_public_key).as_deref() {
            if !request.verify(public_key) {
                return Err(ConfirmationError::Rejected("refill signature invalid".into()));
            }
        }
        let body = request.parse_body()?;
        let requested_name = body
            .blinded_tokens
            .first()
            .map(|t| t.issuer_name.clone())
            .unwrap_or_default();
        let issuer_name = lock(&self.respond_as)
            .clone()
            .unwrap_or(requested_name);

        let keys = lock(&self.keys);
        let key = keys
            .get(&issuer_name)
            .ok_or_else(|| ConfirmationError::Rejected(format!("unknown issuer {issuer_name}")))?;
        let mut signed_tokens = Vec::with_capacity(body.blinded_tokens.len());
        for token in &body.blinded_tokens {
            if take_one(&self.omitted_tokens) {
                continue;
            }
            let point = BlindedPoint::from_base64(&token.blinded_value)?;
            let (signed, proof) = if take_one(&self.wrong_key_signatures) {
                IssuerSecretKey::generate(&mut OsRng)?.sign(&mut OsRng, &point)?
            } else {
                key.sign(&mut OsRng, &point)?
            };
            signed_tokens.push(SignedTokenEntry {
                token_id: token.token_id.clone(),
                signed_value: signed.to_base64(),
                proof: proof.to_base64(),
            });
        }
        Ok(SignedTokensResponse {
            issuer_name,
            signed_tokens,
        })
    }

    fn redeem(&self, payload: &ConfirmationPayload) -> RedemptionStatus {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return RedemptionStatus::Rejected;
        }
        if lock(&self.redeemed).contains(&payload.confirmation_id) {
            return RedemptionStatus::Duplicate;
        }
        if !self.verify(payload) {
            return RedemptionStatus::Rejected;
        }
        let mut spent = lock(&self.spent);
        if spent.contains_key(&payload.token_preimage) {
            return RedemptionStatus::Rejected;
        }
        spent.insert(payload.token_preimage.clone(), payload.confirmation_id.clone());
        lock(&self.redeemed).insert(payload.confirmation_id.clone());
        lock(&self.submissions).push(payload.clone());
        RedemptionStatus::Redeemed
    }

    fn verify(&self, payload: &ConfirmationPayload) -> bool {
        let (Ok(preimage), Ok(signature)) = (
            TokenPreimage::from_base64(&payload.token_preimage),
            RedemptionSignature::from_base64(&payload.unblinded_token_signature),
        ) else {
            return false;
        };
        let keys = lock(&self.keys);
        let retired = lock(&self.retired_keys);
        let verified = keys
            .values()
            .chain(retired.iter())
            .find(|key| key.public_key().to_base64() == payload.public_key)
            .is_some_and(|key| {
                key.verify_redemption(&preimage, payload.signed_message().as_bytes(), &signature)
            });
        verified
    }
}

#[async_trait]
impl ConfirmationsEndpoint for NullIssuer {
    async fn fetch_catalog(&self) -> Result<String, ConfirmationError> {
        let body = lock(&self.catalog_body).clone();
        Ok(body.unwrap_or_else(|| self.catalog().to_json()))
    }

    async fn request_signed_tokens(
        &self,
        request: &RefillRequest,
    ) -> Result<SignedTokensResponse, ConfirmationError> {
        self.refill_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.refill_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(body) = request.parse_body() {
            lock(&self.blinded_seen).extend(body.blinded_tokens.into_iter().map(|t| t.blinded_value));
        }
        if take_one(&self.failing_refills) {
            return Err(ConfirmationError::NetworkTimeout);
        }
        self.sign_all(request)
    }

    async fn submit_confirmation(
        &self,
        payload: &ConfirmationPayload,
    ) -> Result<RedemptionStatus, ConfirmationError> {
        self.submission_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_submissions) {
            return Err(ConfirmationError::NetworkTimeout);
        }
        let status = self.redeem(payload);
        if status == RedemptionStatus::Redeemed && take_one(&self.lost_replies) {
            return Err(ConfirmationError::NetworkTimeout);
        }
        Ok(status)
    }
}
