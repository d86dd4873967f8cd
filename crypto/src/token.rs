//! Client side of blind token issuance.
//!
//! A token is a random 64-byte preimage `t`. The client maps it to the group
//! (`T = H(t)`), blinds it with a random scalar `r` and sends `P = r*T` to the
//! issuer. The issuer returns `Q = k*P` with a DLEQ proof; the client checks
//! the proof against the issuer public key and unblinds `W = r^-1 * Q = k*T`.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{decode_base64_array, encode_base64};
use crate::hash::token_id_hex;
use crate::{CryptoError, DleqProof, IssuerPublicKey};

/// Length of a token preimage in bytes.
pub const PREIMAGE_LEN: usize = 64;

/// Draw a uniformly random non-zero scalar.
pub(crate) fn random_scalar<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
) -> Result<Scalar, CryptoError> {
    let mut wide = [0u8; 64];
    rng.try_fill_bytes(&mut wide)
        .map_err(|e| CryptoError::CryptoFailure(format!("random source: {e}")))?;
    let scalar = Scalar::from_bytes_mod_order_wide(&wide);
    wide.zeroize();
    if scalar == Scalar::ZERO {
        return Err(CryptoError::CryptoFailure("random scalar is zero".into()));
    }
    Ok(scalar)
}

/// The secret preimage `t` of a token.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenPreimage([u8; PREIMAGE_LEN]);

impl TokenPreimage {
    pub fn random<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; PREIMAGE_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::CryptoFailure(format!("random source: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; PREIMAGE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PREIMAGE_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        decode_base64_array::<PREIMAGE_LEN>(s).map(Self)
    }

    /// Hex Blake2b-256 of the preimage, used as the client-side token id.
    pub fn token_id(&self) -> String {
        token_id_hex(&self.0)
    }

    pub(crate) fn hash_to_point(&self) -> RistrettoPoint {
        RistrettoPoint::hash_from_bytes::<Sha512>(&self.0)
    }
}

macro_rules! point_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name(pub(crate) CompressedRistretto);

        impl $name {
            pub fn to_bytes(&self) -> [u8; 32] {
                self.0.to_bytes()
            }

            pub fn to_base64(&self) -> String {
                encode_base64(self.0.as_bytes())
            }

            /// Decode and check that the bytes are a valid group element.
            pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
                let bytes = decode_base64_array::<32>(s)?;
                let compressed = CompressedRistretto(bytes);
                compressed
                    .decompress()
                    .ok_or_else(|| CryptoError::Decode("not a ristretto point".into()))?;
                Ok(Self(compressed))
            }

            pub(crate) fn decompress(&self) -> Result<RistrettoPoint, CryptoError> {
                self.0
                    .decompress()
                    .ok_or_else(|| CryptoError::Decode("not a ristretto point".into()))
            }
        }
    };
}

point_wrapper!(
    /// `P = r*H(t)`, what the issuer sees.
    BlindedPoint
);
point_wrapper!(
    /// `Q = k*P`, the issuer's blind signature.
    SignedPoint
);
point_wrapper!(
    /// `W = k*H(t)`, the unblinded signature held by the client.
    UnblindedSignature
);

/// A freshly generated token together with its blinding factor.
///
/// Dropping it discards (and zeroizes) the blinding material.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BlindingToken {
    preimage: TokenPreimage,
    blind: Scalar,
}

impl BlindingToken {
    pub fn random<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        let preimage = TokenPreimage::random(rng)?;
        let blind = random_scalar(rng)?;
        Ok(Self { preimage, blind })
    }

    pub fn token_id(&self) -> String {
        self.preimage.token_id()
    }

    pub fn preimage(&self) -> &TokenPreimage {
        &self.preimage
    }

    pub fn blinded(&self) -> BlindedPoint {
        BlindedPoint((self.blind * self.preimage.hash_to_point()).compress())
    }

    /// Check the issuer's proof and strip the blinding factor.
    ///
    /// Any proof that does not verify against `issuer` (including a signed
    /// point that is not a group element) is a [`CryptoError::SignatureMismatch`].
    pub fn unblind(
        &self,
        issuer: &IssuerPublicKey,
        signed: &SignedPoint,
        proof: &DleqProof,
    ) -> Result<UnblindedSignature, CryptoError> {
        let p = self.blind * self.preimage.hash_to_point();
        let q = signed
            .decompress()
            .map_err(|_| CryptoError::SignatureMismatch)?;
        if !proof.verify(issuer.point(), &p, &q) {
            return Err(CryptoError::SignatureMismatch);
        }
        let w = self.blind.invert() * q;
        Ok(UnblindedSignature(w.compress()))
    }
}
