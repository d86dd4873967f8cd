//! Redemption proofs.
//!
//! The holder of an unblinded token `(t, W)` derives a verification key from
//! it and MACs the confirmation payload. The issuer, knowing `k`, recomputes
//! `W` from `t` alone, so the payload can be checked without the issuer ever
//! having seen `t` during issuance.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{decode_base64_array, encode_base64};
use crate::{CryptoError, TokenPreimage, UnblindedSignature};

type HmacSha512 = Hmac<Sha512>;

const VERIFICATION_KEY_DOMAIN: &[u8] = b"bat-token-verification";

/// HMAC key shared (implicitly) between token holder and issuer.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VerificationKey([u8; 64]);

impl VerificationKey {
    pub fn derive(preimage: &TokenPreimage, signature: &UnblindedSignature) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(VERIFICATION_KEY_DOMAIN);
        hasher.update(preimage.as_bytes());
        hasher.update(signature.0.as_bytes());
        let digest = hasher.finalize();
        let mut key = [0u8; 64];
        key.copy_from_slice(&digest);
        Self(key)
    }

    pub fn sign(&self, payload: &[u8]) -> Result<RedemptionSignature, CryptoError> {
        let mut mac = HmacSha512::new_from_slice(&self.0)
            .map_err(|e| CryptoError::CryptoFailure(format!("hmac key: {e}")))?;
        mac.update(payload);
        let tag = mac.finalize().into_bytes();
        let mut out = [0u8; 64];
        out.copy_from_slice(&tag);
        Ok(RedemptionSignature(out))
    }

    /// Constant-time check of `signature` over `payload`.
    pub fn verify(&self, payload: &[u8], signature: &RedemptionSignature) -> bool {
        let Ok(mut mac) = HmacSha512::new_from_slice(&self.0) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&signature.0).is_ok()
    }
}

/// HMAC-SHA512 tag proving possession of an unblinded token.
#[derive(Clone)]
pub struct RedemptionSignature([u8; 64]);

impl PartialEq for RedemptionSignature {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for RedemptionSignature {}

impl RedemptionSignature {
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        decode_base64_array::<64>(s).map(Self)
    }
}

impl std::fmt::Debug for RedemptionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedemptionSignature({})", hex::encode(&self.0[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlindingToken, IssuerSecretKey};
    use rand::rngs::OsRng;

    fn unblinded() -> (IssuerSecretKey, BlindingToken, UnblindedSignature) {
        let issuer = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let token = BlindingToken::random(&mut OsRng).unwrap();
        let (signed, proof) = issuer.sign(&mut OsRng, &token.blinded()).unwrap();
        let w = token.unblind(&issuer.public_key(), &signed, &proof).unwrap();
        (issuer, token, w)
    }

    #[test]
    fn issuer_accepts_holder_signature() {
        let (issuer, token, w) = unblinded();
        let sig = VerificationKey::derive(token.preimage(), &w)
            .sign(b"c1|creative|view")
            .unwrap();
        assert!(issuer.verify_redemption(token.preimage(), b"c1|creative|view", &sig));
    }

    #[test]
    fn tampered_payload_rejected() {
        let (issuer, token, w) = unblinded();
        let sig = VerificationKey::derive(token.preimage(), &w)
            .sign(b"c1|creative|view")
            .unwrap();
        assert!(!issuer.verify_redemption(token.preimage(), b"c1|creative|click", &sig));
    }

    #[test]
    fn other_issuer_rejects() {
        let (_, token, w) = unblinded();
        let stranger = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let sig = VerificationKey::derive(token.preimage(), &w).sign(b"p").unwrap();
        assert!(!stranger.verify_redemption(token.preimage(), b"p", &sig));
    }

    #[test]
    fn signature_base64_roundtrip() {
        let (_, token, w) = unblinded();
        let sig = VerificationKey::derive(token.preimage(), &w).sign(b"p").unwrap();
        assert_eq!(RedemptionSignature::from_base64(&sig.to_base64()).unwrap(), sig);
    }
}
