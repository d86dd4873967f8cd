//! The network capability the protocol needs, and its wire types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bat_crypto::{request_digest, sign_request, verify_request};
use bat_tokens::{BlindedToken, UnblindedToken};
use bat_types::{ConfirmationId, ConfirmationType, CreativeInstanceId, PaymentId, TokenId, Wallet};

use crate::ConfirmationError;

/// Body of a token refill request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTokensRequest {
    pub blinded_tokens: Vec<BlindedToken>,
}

/// A refill request authenticated with the wallet key.
///
/// `digest` is `BLAKE2B-256=<base64>` of `body`; `signature` is the wallet's
/// Ed25519 signature over the line `digest: <digest>`.
#[derive(Clone, Debug)]
pub struct RefillRequest {
    pub payment_id: PaymentId,
    pub body: String,
    pub digest: String,
    pub signature: String,
}

impl RefillRequest {
    pub fn sign(wallet: &Wallet, request: &SignedTokensRequest) -> Result<Self, ConfirmationError> {
        let body = serde_json::to_string(request)
            .map_err(|e| ConfirmationError::MalformedRequest(e.to_string()))?;
        let digest = body_digest(&body);
        let signature = sign_request(signed_line(&digest).as_bytes(), &wallet.secret_key_base64)
            .map_err(|e| ConfirmationError::InvalidWallet(e.to_string()))?;
        Ok(Self {
            payment_id: wallet.payment_id.clone(),
            body,
            digest,
            signature,
        })
    }

    /// Check the digest against the body and the signature against `public_key_base64`.
    pub fn verify(&self, public_key_base64: &str) -> bool {
        self.digest == body_digest(&self.body)
            && verify_request(signed_line(&self.digest).as_bytes(), &self.signature, public_key_base64)
    }

    pub fn parse_body(&self) -> Result<SignedTokensRequest, ConfirmationError> {
        serde_json::from_str(&self.body).map_err(|e| ConfirmationError::MalformedRequest(e.to_string()))
    }
}

fn body_digest(body: &str) -> String {
    request_digest(body.as_bytes())
}

fn signed_line(digest: &str) -> String {
    format!("digest: {digest}")
}

/// One blind signature, keyed by the client's token id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTokenEntry {
    pub token_id: TokenId,
    /// Base64 compressed point `k*P`.
    pub signed_value: String,
    /// Base64 DLEQ proof.
    pub proof: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTokensResponse {
    /// Issuer whose key produced the signatures.
    pub issuer_name: String,
    pub signed_tokens: Vec<SignedTokenEntry>,
}

/// What a confirmation reveals: the ad event and one token. Nothing in it
/// identifies the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPayload {
    pub confirmation_id: ConfirmationId,
    pub creative_instance_id: CreativeInstanceId,
    pub confirmation_type: ConfirmationType,
    /// Base64 token preimage `t`.
    pub token_preimage: String,
    /// Base64 public key of the issuer that signed the token.
    pub public_key: String,
    /// Base64 HMAC over [`ConfirmationPayload::signed_message`].
    pub unblinded_token_signature: String,
}

impl ConfirmationPayload {
    pub fn build(
        confirmation_id: &ConfirmationId,
        creative_instance_id: &CreativeInstanceId,
        confirmation_type: ConfirmationType,
        token: &UnblindedToken,
    ) -> Result<Self, ConfirmationError> {
        let message = redemption_message(confirmation_id, creative_instance_id, confirmation_type);
        let signature = token.sign_redemption(message.as_bytes())?;
        Ok(Self {
            confirmation_id: confirmation_id.clone(),
            creative_instance_id: creative_instance_id.clone(),
            confirmation_type,
            token_preimage: token.unblinding_secret.to_base64(),
            public_key: token.public_key.clone(),
            unblinded_token_signature: signature.to_base64(),
        })
    }

    /// The bytes the redemption signature covers.
    pub fn signed_message(&self) -> String {
        redemption_message(&self.confirmation_id, &self.creative_instance_id, self.confirmation_type)
    }
}

fn redemption_message(
    id: &ConfirmationId,
    creative: &CreativeInstanceId,
    confirmation_type: ConfirmationType,
) -> String {
    format!("{id}|{creative}|{confirmation_type}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Redeemed,
    /// The service already redeemed this confirmation id.
    Duplicate,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResponse {
    pub status: RedemptionStatus,
}

/// The payment service as seen by the protocol.
#[async_trait]
pub trait ConfirmationsEndpoint: Send + Sync {
    /// Raw issuer catalog body.
    async fn fetch_catalog(&self) -> Result<String, ConfirmationError>;

    async fn request_signed_tokens(
        &self,
        request: &RefillRequest,
    ) -> Result<SignedTokensResponse, ConfirmationError>;

    async fn submit_confirmation(
        &self,
        payload: &ConfirmationPayload,
    ) -> Result<RedemptionStatus, ConfirmationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_crypto::generate_wallet_keys;

    fn wallet() -> Wallet {
        let keys = generate_wallet_keys();
        Wallet::new(
            PaymentId::new("payment-1"),
            keys.public_key_base64.clone(),
            keys.secret_key_base64.clone(),
        )
    }

    fn request() -> SignedTokensRequest {
        SignedTokensRequest {
            blinded_tokens: vec![BlindedToken {
                token_id: TokenId::new("t1"),
                blinded_value: "AAAA".into(),
                issuer_name: "BAT0.05".into(),
            }],
        }
    }

    #[test]
    fn refill_request_verifies_with_wallet_key() {
        let wallet = wallet();
        let signed = RefillRequest::sign(&wallet, &request()).unwrap();
        assert!(signed.verify(&wallet.public_key_base64));
        assert_eq!(signed.parse_body().unwrap(), request());
        assert!(signed.digest.starts_with("BLAKE2B-256="));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let wallet = wallet();
        let mut signed = RefillRequest::sign(&wallet, &request()).unwrap();
        signed.body = signed.body.replace("t1", "t2");
        assert!(!signed.verify(&wallet.public_key_base64));
    }

    #[test]
    fn other_wallet_key_fails_verification() {
        let signed = RefillRequest::sign(&wallet(), &request()).unwrap();
        assert!(!signed.verify(&wallet().public_key_base64));
    }

    #[test]
    fn unreadable_body_is_a_request_error() {
        let mut signed = RefillRequest::sign(&wallet(), &request()).unwrap();
        signed.body = "{not json".into();
        assert!(matches!(
            signed.parse_body(),
            Err(ConfirmationError::MalformedRequest(_))
        ));
    }

    #[test]
    fn bad_secret_is_invalid_wallet() {
        let broken = Wallet::new(PaymentId::new("p"), "pub", "not-a-key");
        assert!(matches!(
            RefillRequest::sign(&broken, &request()),
            Err(ConfirmationError::InvalidWallet(_))
        ));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_string(&ConfirmationResponse {
            status: RedemptionStatus::Duplicate,
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"duplicate"}"#);
        let body = serde_json::to_string(&request()).unwrap();
        assert!(body.contains("blindedTokens"));
        assert!(body.contains("issuerName"));
    }
}
