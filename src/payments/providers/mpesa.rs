use crate::config::GatewayConfig;
use crate::logging::mask_phone_number;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{InitiateResponse, PollOutcome, StkPushRequest};
use crate::payments::utils::PaymentHttpClient;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// HTTP client for the dashboard's `/api/mpesa` STK-push endpoints.
pub struct MpesaGateway {
    config: GatewayConfig,
    http: PaymentHttpClient,
}

impl MpesaGateway {
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        config
            .validate()
            .map_err(|e| PaymentError::ValidationError {
                message: e.to_string(),
                field: Some("gateway".to_string()),
            })?;
        let http = PaymentHttpClient::new(config.timeout())?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> PaymentResult<Self> {
        let config = GatewayConfig::from_env().map_err(|e| PaymentError::ValidationError {
            message: e.to_string(),
            field: Some("gateway".to_string()),
        })?;
        Self::new(config)
    }

    fn endpoint(&self, path: &str) -> PaymentResult<Url> {
        let raw = format!("{}{}", self.config.base_url, path);
        Url::parse(&raw).map_err(|e| PaymentError::ValidationError {
            message: format!("invalid gateway URL {}: {}", raw, e),
            field: Some("gateway".to_string()),
        })
    }

    fn status_url(&self, tracking_token: &str) -> PaymentResult<Url> {
        let mut url = self.endpoint(&self.config.status_path)?;
        url.query_pairs_mut()
            .append_pair("checkoutRequestId", tracking_token);
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    async fn initiate(&self, request: &StkPushRequest) -> PaymentResult<InitiateResponse> {
        let url = self.endpoint(&self.config.initiate_path)?;
        let reply = self
            .http
            .send(
                reqwest::Method::POST,
                url,
                self.config.api_key.as_deref(),
                Some(request),
            )
            .await?;

        // Rejections arrive as `{success: false, message}`, often with a 4xx.
        let parsed = match reply.parse::<InitiateResponse>() {
            Ok(parsed) => parsed,
            Err(err) => {
                reply.ensure_success()?;
                return Err(err);
            }
        };

        info!(
            phone = %mask_phone_number(&request.phone),
            amount = request.amount,
            account = %request.account,
            http_status = reply.status.as_u16(),
            accepted = parsed.success,
            "mpesa stk push submitted"
        );
        Ok(parsed)
    }

    async fn query_status(&self, tracking_token: &str) -> PaymentResult<PollOutcome> {
        let url = self.status_url(tracking_token)?;
        let reply = self
            .http
            .send::<JsonValue>(
                reqwest::Method::GET,
                url,
                self.config.api_key.as_deref(),
                None,
            )
            .await?
            .ensure_success()?;

        let payload: JsonValue = reply.parse()?;
        let outcome = PollOutcome::from_json(&payload);
        debug!(tracking_token, outcome = ?outcome, "mpesa status queried");
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "mpesa"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> MpesaGateway {
        MpesaGateway::new(GatewayConfig {
            base_url: "https://dashboard.example.com".to_string(),
            api_key: Some("key_test".to_string()),
            ..GatewayConfig::default()
        })
        .expect("gateway init should succeed")
    }

    #[test]
    fn status_url_carries_tracking_token() {
        let url = gateway()
            .status_url("ws_CO_123&x=1")
            .expect("url should build");
        assert_eq!(url.path(), "/api/mpesa");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![("checkoutRequestId".to_string(), "ws_CO_123&x=1".to_string())]
        );
    }

    #[test]
    fn initiate_endpoint_uses_configured_path() {
        let url = gateway()
            .endpoint("/api/mpesa")
            .expect("url should build");
        assert_eq!(url.as_str(), "https://dashboard.example.com/api/mpesa");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = MpesaGateway::new(GatewayConfig {
            base_url: "dashboard.example.com".to_string(),
            ..GatewayConfig::default()
        });
        assert!(matches!(
            result,
            Err(PaymentError::ValidationError { .. })
        ));
    }
}
