//! Trusted token issuers.
//!
//! The [`IssuerRegistry`] holds the issuers published by the catalog behind a
//! copy-on-write snapshot: readers never observe a half-applied refresh, and
//! a refresh is either applied whole or rejected whole.

pub mod catalog;
pub mod error;
pub mod registry;

pub use catalog::{parse_catalog, validate_issuers, Catalog};
pub use error::IssuerError;
pub use registry::{IssuerRegistry, RefreshGuard, RegistrySnapshot, UpdateSummary};
