use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Raw reply from the gateway: HTTP status plus body text.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub body: String,
}

impl GatewayReply {
    pub fn parse<T: DeserializeOwned>(&self) -> PaymentResult<T> {
        serde_json::from_str::<T>(&self.body).map_err(|e| PaymentError::ProviderError {
            provider: "http".to_string(),
            message: format!("invalid gateway JSON response: {}", e),
            provider_code: Some(self.status.as_u16().to_string()),
            retryable: false,
        })
    }

    pub fn ensure_success(self) -> PaymentResult<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(PaymentError::ProviderError {
            provider: "http".to_string(),
            message: format!("HTTP {}: {}", self.status, self.body),
            provider_code: Some(self.status.as_u16().to_string()),
            retryable: self.status.is_server_error(),
        })
    }
}

/// Single-shot JSON client. Every call issues exactly one request.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self { client, timeout })
    }

    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: reqwest::Url,
        bearer_token: Option<&str>,
        body: Option<&B>,
    ) -> PaymentResult<GatewayReply> {
        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header("Accept", "application/json");

        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "gateway request failed");
            PaymentError::NetworkError {
                message: format!("gateway request failed: {}", e),
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: format!("failed to read gateway response: {}", e),
            })?;

        Ok(GatewayReply { status, body })
    }
}
