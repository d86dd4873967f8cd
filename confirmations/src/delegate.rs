//! Notifications to the embedding application.

use bat_types::ConfirmationId;

use crate::ConfirmationError;

/// Sink for protocol events. Every method defaults to a no-op.
pub trait ConfirmationsDelegate: Send + Sync {
    /// A confirmation reached `Failed`; its token is gone.
    fn on_confirmation_failed(&self, _id: &ConfirmationId, _error: &ConfirmationError) {}

    /// A transaction was appended to the ledger.
    fn on_transaction_history_changed(&self) {}

    /// The pool went from empty to non-empty or back.
    fn on_ready_changed(&self, _ready: bool) {}

    fn on_tokens_refilled(&self, _count: usize) {}
}

pub struct NoopDelegate;

impl ConfirmationsDelegate for NoopDelegate {}

/// Reports every event through `tracing`.
pub struct LoggingDelegate;

impl ConfirmationsDelegate for LoggingDelegate {
    fn on_confirmation_failed(&self, id: &ConfirmationId, error: &ConfirmationError) {
        tracing::error!(confirmation_id = %id, %error, "confirmation failed");
    }

    fn on_transaction_history_changed(&self) {
        tracing::info!("transaction history changed");
    }

    fn on_ready_changed(&self, ready: bool) {
        tracing::info!(ready, "confirmations readiness changed");
    }

    fn on_tokens_refilled(&self, count: usize) {
        tracing::info!(count, "tokens refilled");
    }
}
