//! Shared utilities for BAT confirmations: logging setup and retry backoff.

pub mod backoff;
pub mod logging;

pub use backoff::Backoff;
pub use logging::{init_logging, LogFormat};
