//! Spending tokens on ad events.

use std::sync::Arc;

use bat_ledger::ApplyOutcome;
use bat_tokens::UnblindedToken;
use bat_types::{ConfirmationId, ConfirmationType, CreativeInstanceId, Transaction, TransactionId};
use tracing::{debug, info, warn};

use crate::protocol::Inner;
use crate::{
    ConfirmationError, ConfirmationMachine, ConfirmationPayload, Counter, ProtocolState,
    RedemptionStatus,
};

impl Inner {
    pub(crate) async fn confirm(
        self: Arc<Self>,
        creative_instance_id: CreativeInstanceId,
        confirmation_type: ConfirmationType,
    ) -> Result<Transaction, ConfirmationError> {
        let taken = self.pool.take();
        self.report_readiness();
        self.refill_in_background();
        let token = taken?;

        let mut machine = ConfirmationMachine::new(ConfirmationId::generate());
        let result = self
            .redeem(&mut machine, &token, &creative_instance_id, confirmation_type)
            .await;

        // Spent either way; a submitted token may already be known to the issuer.
        self.pool.burn(&token.token_id);
        match result {
            Ok(tx) => {
                self.stats.increment(Counter::ConfirmationsRedeemed);
                Ok(tx)
            }
            Err(e) => {
                machine.fail();
                self.stats.increment(Counter::ConfirmationsFailed);
                warn!(
                    confirmation_id = %machine.id(),
                    creative_instance_id = %creative_instance_id,
                    error = %e,
                    "confirmation failed"
                );
                self.delegate.on_confirmation_failed(machine.id(), &e);
                Err(e)
            }
        }
    }

    async fn redeem(
        &self,
        machine: &mut ConfirmationMachine,
        token: &UnblindedToken,
        creative_instance_id: &CreativeInstanceId,
        confirmation_type: ConfirmationType,
    ) -> Result<Transaction, ConfirmationError> {
        machine.advance(ProtocolState::ConfirmationPrepared)?;
        self.check_issuer(token)?;
        let payload =
            ConfirmationPayload::build(machine.id(), creative_instance_id, confirmation_type, token)?;

        machine.advance(ProtocolState::ConfirmationSent)?;
        let status = self.submit(&payload).await?;
        debug!(confirmation_id = %machine.id(), ?status, "confirmation accepted");

        let tx = Transaction::redemption(
            TransactionId::for_confirmation(machine.id()),
            token.value,
            confirmation_type,
            self.clock.now(),
        );
        if self.ledger.apply_redemption(&tx)? == ApplyOutcome::Applied {
            self.delegate.on_transaction_history_changed();
        }
        machine.advance(ProtocolState::Redeemed)?;
        info!(
            confirmation_id = %machine.id(),
            confirmation_type = %confirmation_type,
            value = %token.value,
            "confirmation redeemed"
        );
        Ok(tx)
    }

    /// The key that signed the token must still belong to an unexpired issuer
    /// of the same name, active or retired.
    fn check_issuer(&self, token: &UnblindedToken) -> Result<(), ConfirmationError> {
        let now = self.clock.now();
        match self.registry.lookup_by_public_key(&token.public_key) {
            Some(issuer) if issuer.name == token.issuer_name && !issuer.is_expired(now) => Ok(()),
            _ => Err(ConfirmationError::RevokedIssuer(token.issuer_name.clone())),
        }
    }

    /// Submit with bounded retry on network failures.
    async fn submit(
        &self,
        payload: &ConfirmationPayload,
    ) -> Result<RedemptionStatus, ConfirmationError> {
        let mut backoff = self.config.backoff();
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .with_timeout(self.endpoint.submit_confirmation(payload))
                .await;
            match result {
                Ok(status @ (RedemptionStatus::Redeemed | RedemptionStatus::Duplicate)) => {
                    return Ok(status)
                }
                Ok(RedemptionStatus::Rejected) => {
                    return Err(ConfirmationError::Rejected(
                        payload.confirmation_id.to_string(),
                    ))
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    self.stats.increment(Counter::SubmissionRetries);
                    let delay = backoff.next_delay();
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "submission failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ConfirmationError::Failed {
                        attempts: attempt,
                        reason: e.to_string(),
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }
}
