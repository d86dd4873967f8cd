//! A delegate that records protocol events for assertions.

use std::sync::{Mutex, PoisonError};

use bat_confirmations::{ConfirmationError, ConfirmationsDelegate};
use bat_types::ConfirmationId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelegateEvent {
    /// Confirmation id and the rendered error.
    ConfirmationFailed(ConfirmationId, String),
    TransactionHistoryChanged,
    ReadyChanged(bool),
    TokensRefilled(usize),
}

#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn failures(&self) -> Vec<ConfirmationId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DelegateEvent::ConfirmationFailed(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &DelegateEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn record(&self, event: DelegateEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ConfirmationsDelegate for RecordingDelegate {
    fn on_confirmation_failed(&self, id: &ConfirmationId, error: &ConfirmationError) {
        self.record(DelegateEvent::ConfirmationFailed(id.clone(), error.to_string()));
    }

    fn on_transaction_history_changed(&self) {
        self.record(DelegateEvent::TransactionHistoryChanged);
    }

    fn on_ready_changed(&self, ready: bool) {
        self.record(DelegateEvent::ReadyChanged(ready));
    }

    fn on_tokens_refilled(&self, count: usize) {
        self.record(DelegateEvent::TokensRefilled(count));
    }
}
