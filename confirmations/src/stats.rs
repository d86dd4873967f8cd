//! Activity counters for refills and confirmations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    RefillRequests,
    /// Refills that ended in an error, after any retries.
    RefillFailures,
    TokensAdded,
    /// Tokens dropped for a bad signature or missing from the response.
    TokensDiscarded,
    ConfirmationsRedeemed,
    ConfirmationsFailed,
    SubmissionRetries,
}

impl Counter {
    pub const ALL: [Counter; 7] = [
        Counter::RefillRequests,
        Counter::RefillFailures,
        Counter::TokensAdded,
        Counter::TokensDiscarded,
        Counter::ConfirmationsRedeemed,
        Counter::ConfirmationsFailed,
        Counter::SubmissionRetries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefillRequests => "refill_requests",
            Self::RefillFailures => "refill_failures",
            Self::TokensAdded => "tokens_added",
            Self::TokensDiscarded => "tokens_discarded",
            Self::ConfirmationsRedeemed => "confirmations_redeemed",
            Self::ConfirmationsFailed => "confirmations_failed",
            Self::SubmissionRetries => "submission_retries",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-lifetime counters, one per [`Counter`]. Not persisted.
#[derive(Debug, Default)]
pub struct ProtocolStats {
    values: [AtomicU64; Counter::ALL.len()],
}

impl ProtocolStats {
    pub fn increment(&self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&self, counter: Counter, n: u64) {
        self.values[counter as usize].fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(Counter, u64)> {
        Counter::ALL.iter().map(|&c| (c, self.get(c))).collect()
    }
}
