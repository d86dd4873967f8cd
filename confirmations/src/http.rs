//! HTTP implementation of [`ConfirmationsEndpoint`] over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::endpoint::{
    ConfirmationPayload, ConfirmationResponse, ConfirmationsEndpoint, RedemptionStatus,
    RefillRequest, SignedTokensResponse,
};
use crate::ConfirmationError;

/// Talks to the payment service at `base_url`.
pub struct HttpEndpoint {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfirmationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfirmationError::Transport(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn catalog_url(&self) -> String {
        format!("{}/v1/issuers/", self.base_url)
    }

    fn refill_url(&self, request: &RefillRequest) -> String {
        format!("{}/v1/confirmation/token/{}", self.base_url, request.payment_id)
    }

    fn confirmation_url(&self, payload: &ConfirmationPayload) -> String {
        format!("{}/v1/confirmation/{}", self.base_url, payload.confirmation_id)
    }
}

fn transport_error(e: reqwest::Error) -> ConfirmationError {
    if e.is_timeout() {
        ConfirmationError::NetworkTimeout
    } else {
        ConfirmationError::Transport(e.to_string())
    }
}

/// Server errors and throttling are worth retrying; other failures are final.
fn status_error(status: StatusCode, what: &str) -> ConfirmationError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ConfirmationError::Transport(format!("{what}: HTTP {status}"))
    } else {
        ConfirmationError::Rejected(format!("{what}: HTTP {status}"))
    }
}

#[async_trait]
impl ConfirmationsEndpoint for HttpEndpoint {
    async fn fetch_catalog(&self) -> Result<String, ConfirmationError> {
        let response = self
            .client
            .get(self.catalog_url())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "catalog"));
        }
        response.text().await.map_err(transport_error)
    }

    async fn request_signed_tokens(
        &self,
        request: &RefillRequest,
    ) -> Result<SignedTokensResponse, ConfirmationError> {
        let signature = format!(
            "keyId=\"primary\",algorithm=\"ed25519\",headers=\"digest\",signature=\"{}\"",
            request.signature
        );
        let response = self
            .client
            .post(self.refill_url(request))
            .header("digest", &request.digest)
            .header("signature", signature)
            .header("content-type", "application/json")
            .body(request.body.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "token refill"));
        }
        response
            .json::<SignedTokensResponse>()
            .await
            .map_err(|e| ConfirmationError::MalformedResponse(e.to_string()))
    }

    async fn submit_confirmation(
        &self,
        payload: &ConfirmationPayload,
    ) -> Result<RedemptionStatus, ConfirmationError> {
        let response = self
            .client
            .post(self.confirmation_url(payload))
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Ok(RedemptionStatus::Duplicate);
        }
        if !status.is_success() {
            return Err(status_error(status, "confirmation"));
        }
        let body = response
            .json::<ConfirmationResponse>()
            .await
            .map_err(|e| ConfirmationError::MalformedResponse(e.to_string()))?;
        Ok(body.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_types::{ConfirmationId, ConfirmationType, CreativeInstanceId, PaymentId};

    fn endpoint() -> HttpEndpoint {
        HttpEndpoint::new("https://ads-serve.brave.software/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn urls_are_built_from_base() {
        let endpoint = endpoint();
        assert_eq!(endpoint.base_url(), "https://ads-serve.brave.software");
        assert_eq!(endpoint.catalog_url(), "https://ads-serve.brave.software/v1/issuers/");

        let request = RefillRequest {
            payment_id: PaymentId::new("p-1"),
            body: String::new(),
            digest: String::new(),
            signature: String::new(),
        };
        assert_eq!(
            endpoint.refill_url(&request),
            "https://ads-serve.brave.software/v1/confirmation/token/p-1"
        );

        let payload = ConfirmationPayload {
            confirmation_id: ConfirmationId::new("c-1"),
            creative_instance_id: CreativeInstanceId::new("cr"),
            confirmation_type: ConfirmationType::View,
            token_preimage: String::new(),
            public_key: String::new(),
            unblinded_token_signature: String::new(),
        };
        assert_eq!(
            endpoint.confirmation_url(&payload),
            "https://ads-serve.brave.software/v1/confirmation/c-1"
        );
    }

    #[test]
    fn status_classification() {
        assert!(status_error(StatusCode::BAD_GATEWAY, "x").is_retryable());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "x").is_retryable());
        assert!(!status_error(StatusCode::BAD_REQUEST, "x").is_retryable());
    }

    #[tokio::test]
    async fn unreachable_service_is_retryable() {
        let endpoint = HttpEndpoint::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = endpoint.fetch_catalog().await.unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }
}
