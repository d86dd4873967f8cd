//! Topping up the token pool from the issuer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use bat_crypto::{DleqProof, SignedPoint};
use bat_tokens::{PendingToken, TokenError, UnblindedToken};
use bat_types::{Issuer, TokenId, Wallet};
use tracing::{debug, info, warn};

use crate::protocol::{Inner, RefillOutcome};
use crate::{
    ConfirmationError, Counter, ProtocolState, RefillRequest, SignedTokensRequest,
    SignedTokensResponse,
};

/// Holds the refill phase while a refill runs and puts it back to idle when
/// the refill ends, however it ends.
struct RefillPhase<'a> {
    phase: &'a Mutex<ProtocolState>,
}

impl<'a> RefillPhase<'a> {
    fn begin(phase: &'a Mutex<ProtocolState>) -> Result<Self, ConfirmationError> {
        let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
        if !current.can_transition_to(ProtocolState::TokensRequested) {
            return Err(ConfirmationError::InvalidTransition {
                from: *current,
                to: ProtocolState::TokensRequested,
            });
        }
        *current = ProtocolState::TokensRequested;
        Ok(Self { phase })
    }

    fn advance(&self, next: ProtocolState) -> Result<(), ConfirmationError> {
        let mut current = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if !current.can_transition_to(next) {
            return Err(ConfirmationError::InvalidTransition { from: *current, to: next });
        }
        *current = next;
        Ok(())
    }
}

impl Drop for RefillPhase<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = ProtocolState::Idle;
    }
}

/// Tokens accepted from one response.
struct Accepted {
    tokens: Vec<UnblindedToken>,
    discarded: usize,
}

impl Inner {
    /// Refill up to the high-water mark if below the low-water mark.
    pub(crate) async fn refill_if_necessary(&self) -> Result<RefillOutcome, ConfirmationError> {
        let spendable = self.pool.spendable_count();
        if spendable >= self.config.low_water_mark {
            debug!(spendable, "token pool above low-water mark");
            return Ok(RefillOutcome::NotNeeded { spendable });
        }
        let count = self.config.high_water_mark.saturating_sub(spendable);
        self.refill(count).await
    }

    /// Start a refill on its own task when the pool has dropped below the
    /// low-water mark. Overlapping triggers collapse into one refill.
    pub(crate) fn refill_in_background(self: &Arc<Self>) {
        if !self.config.auto_refill || self.pool.spendable_count() >= self.config.low_water_mark {
            return;
        }
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            match inner.refill_if_necessary().await {
                Ok(outcome) => debug!(?outcome, "background refill finished"),
                Err(e) => warn!(error = %e, "background refill failed"),
            }
        });
    }

    /// Request `count` tokens from the first current issuer.
    ///
    /// At most one refill runs at a time. Network failures are retried with
    /// backoff and fresh blinding factors on every attempt.
    pub(crate) async fn refill(&self, count: usize) -> Result<RefillOutcome, ConfirmationError> {
        let Ok(_slot) = self.refill_slot.try_lock() else {
            debug!("refill already in progress");
            return Ok(RefillOutcome::AlreadyInProgress);
        };
        let wallet = self
            .wallet()
            .ok_or_else(|| ConfirmationError::InvalidWallet("no wallet set".into()))?;
        let issuer = self
            .registry
            .current(self.clock.now())
            .into_iter()
            .next()
            .ok_or(ConfirmationError::NoIssuers)?;

        let phase = RefillPhase::begin(&self.refill_phase)?;
        self.stats.increment(Counter::RefillRequests);
        info!(count, issuer = %issuer.name, "requesting signed tokens");

        let mut backoff = self.config.backoff();
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0;
        let accepted = loop {
            attempt += 1;
            match self.refill_attempt(&wallet, &issuer, count).await {
                Ok(accepted) => break accepted,
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff.next_delay();
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "refill attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    self.stats.increment(Counter::RefillFailures);
                    warn!(attempts = attempt, error = %e, "refill gave up");
                    return Err(ConfirmationError::Failed {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    self.stats.increment(Counter::RefillFailures);
                    warn!(error = %e, "refill failed");
                    return Err(e);
                }
            }
        };

        phase.advance(ProtocolState::TokensIssued)?;
        let added = self.pool.add(accepted.tokens)?;
        self.stats.add(Counter::TokensAdded, added as u64);
        self.stats.add(Counter::TokensDiscarded, accepted.discarded as u64);
        info!(added, discarded = accepted.discarded, "token pool refilled");
        self.report_readiness();
        self.delegate.on_tokens_refilled(added);
        Ok(RefillOutcome::Refilled {
            requested: count,
            added,
            discarded: accepted.discarded,
        })
    }

    async fn refill_attempt(
        &self,
        wallet: &Wallet,
        issuer: &Issuer,
        count: usize,
    ) -> Result<Accepted, ConfirmationError> {
        let (blinded_tokens, pending): (Vec<_>, Vec<_>) =
            self.generator.generate(count, &issuer.name)?.into_iter().unzip();
        let request = RefillRequest::sign(wallet, &SignedTokensRequest { blinded_tokens })?;
        let response = self
            .with_timeout(self.endpoint.request_signed_tokens(&request))
            .await?;
        self.accept(pending, response)
    }

    /// Verify and unblind every signature in `response`.
    ///
    /// Signatures that fail verification and tokens the issuer left out are
    /// discarded. Entries for ids we never sent are ignored.
    fn accept(
        &self,
        pending: Vec<PendingToken>,
        response: SignedTokensResponse,
    ) -> Result<Accepted, ConfirmationError> {
        let now = self.clock.now();
        let issuer = self
            .registry
            .snapshot()
            .active
            .get(&response.issuer_name)
            .filter(|issuer| issuer.is_active(now))
            .cloned()
            .ok_or_else(|| ConfirmationError::RevokedIssuer(response.issuer_name.clone()))?;

        let mut pending: HashMap<TokenId, PendingToken> = pending
            .into_iter()
            .map(|p| (p.token_id().clone(), p))
            .collect();
        let mut tokens = Vec::with_capacity(response.signed_tokens.len());
        let mut discarded = 0;
        for entry in response.signed_tokens {
            let Some(token) = pending.remove(&entry.token_id) else {
                debug!(token_id = %entry.token_id, "ignoring signature for unknown token");
                continue;
            };
            match unblind_entry(&token, &issuer, &entry.signed_value, &entry.proof) {
                Ok(unblinded) => tokens.push(unblinded),
                Err(e) => {
                    discarded += 1;
                    warn!(token_id = %entry.token_id, error = %e, "discarding token with invalid signature");
                }
            }
        }
        if !pending.is_empty() {
            warn!(missing = pending.len(), "issuer did not sign every token");
            discarded += pending.len();
        }
        Ok(Accepted { tokens, discarded })
    }
}

fn unblind_entry(
    token: &PendingToken,
    issuer: &Issuer,
    signed_value: &str,
    proof: &str,
) -> Result<UnblindedToken, TokenError> {
    let signed = SignedPoint::from_base64(signed_value)?;
    let proof = DleqProof::from_base64(proof)?;
    token.unblind(issuer, &signed, &proof)
}
