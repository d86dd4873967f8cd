//! Token representations at each stage.

use serde::{Deserialize, Serialize};

use bat_crypto::{
    BlindingToken, DleqProof, IssuerPublicKey, RedemptionSignature, SignedPoint, TokenPreimage,
    UnblindedSignature, VerificationKey,
};
use bat_types::{Amount, Issuer, TokenId};

use crate::TokenError;

/// What the issuer sees: an opaque id and the blinded point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindedToken {
    pub token_id: TokenId,
    /// Base64 compressed Ristretto point `r*H(t)`.
    pub blinded_value: String,
    pub issuer_name: String,
}

/// Local half of a blinded token, holding the unblinding material.
///
/// Dropping it (for example when a refill is cancelled) zeroizes the
/// blinding factor and preimage.
pub struct PendingToken {
    token_id: TokenId,
    issuer_name: String,
    blinding: BlindingToken,
}

impl PendingToken {
    pub(crate) fn new(blinding: BlindingToken, issuer_name: &str) -> Self {
        Self {
            token_id: TokenId::new(blinding.token_id()),
            issuer_name: issuer_name.to_string(),
            blinding,
        }
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// The unblinding preimage, for test issuers that must inspect it.
    pub fn preimage(&self) -> &TokenPreimage {
        self.blinding.preimage()
    }

    /// Verify the issuer's signature and unblind.
    ///
    /// `issuer` must be the registered issuer the response names; its key
    /// and denomination are taken from the registry, never from the response.
    pub fn unblind(
        &self,
        issuer: &Issuer,
        signed: &SignedPoint,
        proof: &DleqProof,
    ) -> Result<UnblindedToken, TokenError> {
        let public_key = IssuerPublicKey::from_base64(&issuer.public_key)?;
        let value = issuer.denomination()?;
        let signature = self.blinding.unblind(&public_key, signed, proof)?;
        Ok(UnblindedToken {
            token_id: self.token_id.clone(),
            issuer_name: issuer.name.clone(),
            public_key: issuer.public_key.clone(),
            unblinding_secret: self.blinding.preimage().clone(),
            signature,
            value,
        })
    }
}

impl std::fmt::Debug for PendingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingToken")
            .field("token_id", &self.token_id)
            .field("issuer_name", &self.issuer_name)
            .finish_non_exhaustive()
    }
}

/// A spendable token: preimage `t` plus the unblinded signature `W = k*H(t)`.
#[derive(Clone)]
pub struct UnblindedToken {
    pub token_id: TokenId,
    pub issuer_name: String,
    /// Base64 public key of the issuer that signed it.
    pub public_key: String,
    pub unblinding_secret: TokenPreimage,
    pub signature: UnblindedSignature,
    pub value: Amount,
}

/// Persisted form: everything as strings so the record outlives point types.
#[derive(Serialize, Deserialize)]
struct StoredToken {
    token_id: String,
    issuer_name: String,
    public_key: String,
    unblinding_secret: String,
    signature: String,
    value: u128,
}

impl UnblindedToken {
    /// MAC `payload` with this token's verification key.
    pub fn sign_redemption(&self, payload: &[u8]) -> Result<RedemptionSignature, TokenError> {
        let key = VerificationKey::derive(&self.unblinding_secret, &self.signature);
        Ok(key.sign(payload)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        let stored = StoredToken {
            token_id: self.token_id.to_string(),
            issuer_name: self.issuer_name.clone(),
            public_key: self.public_key.clone(),
            unblinding_secret: self.unblinding_secret.to_base64(),
            signature: self.signature.to_base64(),
            value: self.value.raw(),
        };
        bincode::serialize(&stored).map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let stored: StoredToken =
            bincode::deserialize(bytes).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let token = Self {
            token_id: TokenId::new(stored.token_id),
            issuer_name: stored.issuer_name,
            public_key: stored.public_key,
            unblinding_secret: TokenPreimage::from_base64(&stored.unblinding_secret)?,
            signature: UnblindedSignature::from_base64(&stored.signature)?,
            value: Amount::new(stored.value),
        };
        if token.unblinding_secret.token_id() != token.token_id.as_str() {
            return Err(TokenError::Encoding(format!(
                "token {} does not match its preimage",
                token.token_id
            )));
        }
        Ok(token)
    }
}

impl std::fmt::Debug for UnblindedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnblindedToken")
            .field("token_id", &self.token_id)
            .field("issuer_name", &self.issuer_name)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenGenerator;
    use bat_crypto::{IssuerSecretKey, CryptoError};
    use bat_types::Timestamp;
    use rand::rngs::OsRng;

    fn issuer(key: &IssuerSecretKey) -> Issuer {
        Issuer::new(
            "BAT0.05",
            key.public_key().to_base64(),
            Timestamp::EPOCH,
            Timestamp::MAX,
        )
    }

    #[test]
    fn unblind_carries_issuer_value_and_key() {
        let sk = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let mut batch = TokenGenerator::with_os_rng().generate(1, "BAT0.05").unwrap();
        let (blinded, pending) = batch.remove(0);
        let point = bat_crypto::BlindedPoint::from_base64(&blinded.blinded_value).unwrap();
        let (signed, proof) = sk.sign(&mut OsRng, &point).unwrap();

        let token = pending.unblind(&issuer(&sk), &signed, &proof).unwrap();
        assert_eq!(token.token_id, blinded.token_id);
        assert_eq!(token.value, Amount::from_decimal_str("0.05").unwrap());
        assert_eq!(token.public_key, sk.public_key().to_base64());
    }

    #[test]
    fn wrong_issuer_key_is_signature_mismatch() {
        let signer = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let registered = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let (blinded, pending) = TokenGenerator::with_os_rng()
            .generate(1, "BAT0.05")
            .unwrap()
            .remove(0);
        let point = bat_crypto::BlindedPoint::from_base64(&blinded.blinded_value).unwrap();
        let (signed, proof) = signer.sign(&mut OsRng, &point).unwrap();

        let err = pending.unblind(&issuer(&registered), &signed, &proof).unwrap_err();
        assert!(matches!(err, TokenError::Crypto(CryptoError::SignatureMismatch)));
    }

    #[test]
    fn stored_form_roundtrips_and_still_redeems() {
        let sk = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let (blinded, pending) = TokenGenerator::with_os_rng()
            .generate(1, "BAT0.05")
            .unwrap()
            .remove(0);
        let point = bat_crypto::BlindedPoint::from_base64(&blinded.blinded_value).unwrap();
        let (signed, proof) = sk.sign(&mut OsRng, &point).unwrap();
        let token = pending.unblind(&issuer(&sk), &signed, &proof).unwrap();

        let restored = UnblindedToken::from_bytes(&token.to_bytes().unwrap()).unwrap();
        let sig = restored.sign_redemption(b"payload").unwrap();
        assert!(sk.verify_redemption(&restored.unblinding_secret, b"payload", &sig));
    }

    #[test]
    fn debug_hides_secret() {
        let (_, pending) = TokenGenerator::with_os_rng()
            .generate(1, "BAT1")
            .unwrap()
            .remove(0);
        let dbg = format!("{pending:?}");
        assert!(dbg.contains("BAT1"));
        assert!(!dbg.contains("blinding"));
    }
}
