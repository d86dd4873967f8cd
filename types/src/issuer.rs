//! Issuers: the trusted parties whose keys sign tokens.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Amount, Timestamp, TypesError};

/// Prefix of issuer names that carry a token denomination (`BAT0.05`).
pub const DENOMINATION_PREFIX: &str = "BAT";

/// A token issuer as published by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub name: String,
    /// Base64 of the issuer's compressed Ristretto public key.
    pub public_key: String,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,
}

impl Issuer {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        valid_from: Timestamp,
        valid_until: Timestamp,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            valid_from,
            valid_until,
        }
    }

    /// Value of each token signed by this issuer, parsed from its name.
    pub fn denomination(&self) -> Result<Amount, TypesError> {
        let value = self
            .name
            .strip_prefix(DENOMINATION_PREFIX)
            .ok_or_else(|| TypesError::InvalidDenomination(self.name.clone()))?;
        Amount::from_decimal_str(value)
            .map_err(|_| TypesError::InvalidDenomination(self.name.clone()))
    }

    /// Whether `now` is at or past the end of the validity window.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.valid_until
    }

    /// Whether `now` lies inside `[valid_from, valid_until)`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        now >= self.valid_from && !self.is_expired(now)
    }

    /// Whether the validity windows of two issuers intersect.
    pub fn overlaps(&self, other: &Issuer) -> bool {
        self.valid_from < other.valid_until && other.valid_from < self.valid_until
    }
}

/// Ordered collection of issuers; insertion order is discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IssuerSet {
    issuers: Vec<Issuer>,
    by_name: HashMap<String, usize>,
}

impl IssuerSet {
    pub fn new(issuers: Vec<Issuer>) -> Self {
        let mut by_name = HashMap::with_capacity(issuers.len());
        for (idx, issuer) in issuers.iter().enumerate() {
            by_name.entry(issuer.name.clone()).or_insert(idx);
        }
        Self { issuers, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Issuer> {
        self.by_name.get(name).map(|&idx| &self.issuers[idx])
    }

    pub fn get_by_public_key(&self, public_key: &str) -> Option<&Issuer> {
        self.issuers.iter().find(|i| i.public_key == public_key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issuer> {
        self.issuers.iter()
    }

    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }

    pub fn into_vec(self) -> Vec<Issuer> {
        self.issuers
    }
}

impl FromIterator<Issuer> for IssuerSet {
    fn from_iter<I: IntoIterator<Item = Issuer>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
