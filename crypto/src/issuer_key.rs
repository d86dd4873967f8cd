//! Issuer side of blind token issuance and redemption.
//!
//! Only the issuing service holds an [`IssuerSecretKey`]; the client uses it
//! through in-process test doubles and never in production paths.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{decode_base64_array, encode_base64};
use crate::token::random_scalar;
use crate::{
    BlindedPoint, CryptoError, DleqProof, RedemptionSignature, SignedPoint, TokenPreimage,
    UnblindedSignature, VerificationKey,
};

/// The issuer's public key `Y = k*G`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuerPublicKey(RistrettoPoint);

impl IssuerPublicKey {
    pub fn point(&self) -> &RistrettoPoint {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        encode_base64(self.0.compress().as_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base64_array::<32>(s)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        CompressedRistretto(bytes)
            .decompress()
            .map(Self)
            .ok_or_else(|| CryptoError::InvalidKey("not a ristretto point".into()))
    }
}

/// The issuer's signing scalar `k`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct IssuerSecretKey(Scalar);

impl IssuerSecretKey {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        random_scalar(rng).map(Self)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
            .filter(|k| *k != Scalar::ZERO)
            .map(Self)
            .ok_or_else(|| CryptoError::InvalidKey("non-canonical or zero scalar".into()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> IssuerPublicKey {
        IssuerPublicKey(RistrettoPoint::mul_base(&self.0))
    }

    /// Blind-sign `blinded`, returning `Q = k*P` and its DLEQ proof.
    pub fn sign<R: RngCore + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        blinded: &BlindedPoint,
    ) -> Result<(SignedPoint, DleqProof), CryptoError> {
        let p = blinded.decompress()?;
        let q = self.0 * p;
        let y = RistrettoPoint::mul_base(&self.0);
        let proof = DleqProof::prove(rng, &self.0, &y, &p, &q)?;
        Ok((SignedPoint(q.compress()), proof))
    }

    /// `W = k*H(t)`, the unblinded signature the holder of `t` should have.
    pub fn unblinded_signature_for(&self, preimage: &TokenPreimage) -> UnblindedSignature {
        UnblindedSignature((self.0 * preimage.hash_to_point()).compress())
    }

    /// Check a redemption: the HMAC over `payload` must be keyed by a token
    /// this issuer signed.
    pub fn verify_redemption(
        &self,
        preimage: &TokenPreimage,
        payload: &[u8],
        signature: &RedemptionSignature,
    ) -> bool {
        let w = self.unblinded_signature_for(preimage);
        VerificationKey::derive(preimage, &w).verify(payload, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn public_key_base64_roundtrip() {
        let sk = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let pk = sk.public_key();
        assert_eq!(IssuerPublicKey::from_base64(&pk.to_base64()).unwrap(), pk);
    }

    #[test]
    fn invalid_public_keys_rejected() {
        assert!(IssuerPublicKey::from_base64("").is_err());
        assert!(IssuerPublicKey::from_base64(&encode_base64(&[0xFF; 32])).is_err());
        assert!(IssuerPublicKey::from_base64(&encode_base64(&[1u8; 16])).is_err());
    }

    #[test]
    fn secret_key_bytes_roundtrip() {
        let sk = IssuerSecretKey::generate(&mut OsRng).unwrap();
        let restored = IssuerSecretKey::from_bytes(sk.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), sk.public_key());
        assert!(IssuerSecretKey::from_bytes([0u8; 32]).is_err());
    }
}
