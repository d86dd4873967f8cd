//! Catalog wire format and validation.
//!
//! ```json
//! {"issuers":[{"name":"BAT0.05","publicKey":"...","validFrom":0,"validUntil":1}]}
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use bat_crypto::IssuerPublicKey;
use bat_types::{Issuer, IssuerSet};

use crate::IssuerError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub issuers: Vec<Issuer>,
}

impl Catalog {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Parse and validate a catalog response body.
pub fn parse_catalog(body: &str) -> Result<IssuerSet, IssuerError> {
    let catalog: Catalog =
        serde_json::from_str(body).map_err(|e| IssuerError::InvalidCatalog(e.to_string()))?;
    validate_issuers(&catalog.issuers)?;
    Ok(IssuerSet::new(catalog.issuers))
}

/// Check every rule a catalog must satisfy. The first violation rejects the
/// whole list.
pub fn validate_issuers(issuers: &[Issuer]) -> Result<(), IssuerError> {
    let mut names = HashSet::with_capacity(issuers.len());
    let mut keys: HashMap<&str, &str> = HashMap::with_capacity(issuers.len());
    let mut by_denomination: HashMap<u128, Vec<&Issuer>> = HashMap::new();

    for issuer in issuers {
        if issuer.name.is_empty() {
            return Err(invalid("issuer with empty name"));
        }
        if issuer.public_key.is_empty() {
            return Err(invalid(format!("issuer {} has no public key", issuer.name)));
        }
        IssuerPublicKey::from_base64(&issuer.public_key)
            .map_err(|e| invalid(format!("issuer {}: {e}", issuer.name)))?;
        if !names.insert(issuer.name.as_str()) {
            return Err(invalid(format!("duplicate issuer {}", issuer.name)));
        }
        if let Some(other) = keys.insert(issuer.public_key.as_str(), issuer.name.as_str()) {
            return Err(invalid(format!(
                "issuers {other} and {} share a public key",
                issuer.name
            )));
        }
        if issuer.valid_until <= issuer.valid_from {
            return Err(invalid(format!("issuer {} has an empty validity window", issuer.name)));
        }
        let denomination = issuer
            .denomination()
            .map_err(|e| invalid(e.to_string()))?;
        let peers = by_denomination.entry(denomination.raw()).or_default();
        if let Some(clash) = peers.iter().find(|other| other.overlaps(issuer)) {
            return Err(invalid(format!(
                "issuers {} and {} are active for the same denomination at once",
                clash.name, issuer.name
            )));
        }
        peers.push(issuer);
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> IssuerError {
    IssuerError::InvalidCatalog(msg.into())
}
