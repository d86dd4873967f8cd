//! Blinded token generation.

use std::sync::{Mutex, PoisonError};

use bat_crypto::{BlindingToken, SecureRandom};
use rand::rngs::OsRng;

use crate::{BlindedToken, PendingToken, TokenError};

/// Upper bound on the slots reserved before generating a batch.
const PREALLOCATE_MAX: usize = 256;

/// Produces independent blinded tokens from an injected random source.
pub struct TokenGenerator {
    rng: Mutex<Box<dyn SecureRandom>>,
}

impl TokenGenerator {
    pub fn new(rng: Box<dyn SecureRandom>) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn with_os_rng() -> Self {
        Self::new(Box::new(OsRng))
    }

    /// Generate `count` tokens for `issuer_name`.
    ///
    /// All-or-nothing: if the random source fails for any token, the whole
    /// batch is dropped (zeroizing what was produced) and
    /// [`bat_crypto::CryptoError::CryptoFailure`] is returned.
    pub fn generate(
        &self,
        count: usize,
        issuer_name: &str,
    ) -> Result<Vec<(BlindedToken, PendingToken)>, TokenError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = Vec::with_capacity(count.min(PREALLOCATE_MAX));
        for _ in 0..count {
            let blinding = BlindingToken::random(&mut **rng)?;
            let blinded = BlindedToken {
                token_id: bat_types::TokenId::new(blinding.token_id()),
                blinded_value: blinding.blinded().to_base64(),
                issuer_name: issuer_name.to_string(),
            };
            batch.push((blinded, PendingToken::new(blinding, issuer_name)));
        }
        tracing::debug!(count, issuer = issuer_name, "generated blinded tokens");
        Ok(batch)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::with_os_rng()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_crypto::CryptoError;
    use bat_nullables::FailingRandom;
    use std::collections::HashSet;

    #[test]
    fn zero_count_is_empty() {
        assert!(TokenGenerator::with_os_rng().generate(0, "BAT1").unwrap().is_empty());
    }

    #[test]
    fn ids_are_distinct() {
        let batch = TokenGenerator::with_os_rng().generate(50, "BAT1").unwrap();
        let ids: HashSet<_> = batch.iter().map(|(b, _)| b.token_id.clone()).collect();
        assert_eq!(ids.len(), 50);
        assert!(batch.iter().all(|(b, p)| &b.token_id == p.token_id()));
    }

    #[test]
    fn failing_random_source_fails_whole_batch() {
        let generator = TokenGenerator::new(Box::new(FailingRandom::new()));
        let err = generator.generate(3, "BAT1").unwrap_err();
        assert!(matches!(err, TokenError::Crypto(CryptoError::CryptoFailure(_))));
    }

    #[test]
    fn huge_count_fails_without_reserving_it_up_front() {
        let generator = TokenGenerator::new(Box::new(FailingRandom::after_bytes(128)));
        assert!(generator.generate(usize::MAX, "BAT1").is_err());
    }

    #[test]
    fn failure_midway_discards_earlier_tokens() {
        // 64 bytes of preimage + 64 bytes of blind per token.
        let generator = TokenGenerator::new(Box::new(FailingRandom::after_bytes(128 * 2)));
        assert!(generator.generate(3, "BAT1").is_err());
        assert_eq!(generator.generate(0, "BAT1").unwrap().len(), 0);
    }
}
