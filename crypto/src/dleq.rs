//! Chaum-Pedersen proof of discrete-log equality.
//!
//! Proves `log_G(Y) == log_P(Q)`: the issuer signed `P` with the same secret
//! `k` that backs its published key `Y`. Non-interactive via Fiat-Shamir
//! over SHA-512.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::encoding::{decode_base64_array, encode_base64};
use crate::token::random_scalar;
use crate::CryptoError;

const DLEQ_DOMAIN: &[u8] = b"bat-confirmations-dleq-v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DleqProof {
    c: Scalar,
    s: Scalar,
}

impl DleqProof {
    /// Prove that `y = k*G` and `q = k*p`.
    pub fn prove<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        k: &Scalar,
        y: &RistrettoPoint,
        p: &RistrettoPoint,
        q: &RistrettoPoint,
    ) -> Result<Self, CryptoError> {
        let mut n = random_scalar(rng)?;
        let a = RistrettoPoint::mul_base(&n);
        let b = n * p;
        let c = challenge(y, p, q, &a, &b);
        let s = n - c * k;
        n.zeroize();
        Ok(Self { c, s })
    }

    pub fn verify(&self, y: &RistrettoPoint, p: &RistrettoPoint, q: &RistrettoPoint) -> bool {
        let a = RistrettoPoint::mul_base(&self.s) + self.c * y;
        let b = self.s * p + self.c * q;
        challenge(y, p, q, &a, &b) == self.c
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(self.c.as_bytes());
        out[32..].copy_from_slice(self.s.as_bytes());
        out
    }

    /// Parse a proof; both scalars must be canonically encoded.
    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self, CryptoError> {
        let mut c = [0u8; 32];
        let mut s = [0u8; 32];
        c.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        let c = Option::<Scalar>::from(Scalar::from_canonical_bytes(c))
            .ok_or_else(|| CryptoError::Decode("non-canonical proof scalar".into()))?;
        let s = Option::<Scalar>::from(Scalar::from_canonical_bytes(s))
            .ok_or_else(|| CryptoError::Decode("non-canonical proof scalar".into()))?;
        Ok(Self { c, s })
    }

    pub fn to_base64(&self) -> String {
        encode_base64(&self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&decode_base64_array::<64>(s)?)
    }
}

fn challenge(
    y: &RistrettoPoint,
    p: &RistrettoPoint,
    q: &RistrettoPoint,
    a: &RistrettoPoint,
    b: &RistrettoPoint,
) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(DLEQ_DOMAIN);
    for point in [&RISTRETTO_BASEPOINT_POINT, y, p, q, a, b] {
        hasher.update(point.compress().as_bytes());
    }
    Scalar::from_hash(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn setup() -> (Scalar, RistrettoPoint, RistrettoPoint, RistrettoPoint) {
        let k = random_scalar(&mut OsRng).unwrap();
        let y = RistrettoPoint::mul_base(&k);
        let p = RistrettoPoint::hash_from_bytes::<Sha512>(b"blinded");
        let q = k * p;
        (k, y, p, q)
    }

    #[test]
    fn honest_proof_verifies() {
        let (k, y, p, q) = setup();
        let proof = DleqProof::prove(&mut OsRng, &k, &y, &p, &q).unwrap();
        assert!(proof.verify(&y, &p, &q));
    }

    #[test]
    fn proof_does_not_transfer_to_other_points() {
        let (k, y, p, q) = setup();
        let proof = DleqProof::prove(&mut OsRng, &k, &y, &p, &q).unwrap();
        let other = RistrettoPoint::hash_from_bytes::<Sha512>(b"other");
        assert!(!proof.verify(&y, &other, &(k * other + q)));
        assert!(!proof.verify(&(y + y), &p, &q));
    }

    #[test]
    fn encoding_roundtrip_preserves_validity() {
        let (k, y, p, q) = setup();
        let proof = DleqProof::prove(&mut OsRng, &k, &y, &p, &q).unwrap();
        let decoded = DleqProof::from_base64(&proof.to_base64()).unwrap();
        assert!(decoded.verify(&y, &p, &q));
        assert!(DleqProof::from_bytes(&[0xFF; 64]).is_err());
    }
}
