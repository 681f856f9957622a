use crate::config::PhoneConfig;
use crate::logging::mask_phone_number;
use crate::payments::error::PaymentResult;
use crate::payments::gateway::PaymentGateway;
use crate::payments::session::{NETWORK_FAILURE_REASON, REJECTION_FALLBACK_REASON};
use crate::payments::types::{PaymentRequest, StkPushRequest};
use crate::payments::validation::{normalize_phone, validate_amount};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of the single initiation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationOutcome {
    Accepted { tracking_token: String },
    Rejected { reason: String },
    Unreachable { reason: String },
}

pub struct PaymentInitiator {
    gateway: Arc<dyn PaymentGateway>,
    phone_rules: PhoneConfig,
}

impl PaymentInitiator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, phone_rules: PhoneConfig) -> Self {
        Self {
            gateway,
            phone_rules,
        }
    }

    /// Local guards; no network traffic happens here.
    pub fn prepare(&self, request: &PaymentRequest) -> PaymentResult<StkPushRequest> {
        let amount = validate_amount(request.amount)?;
        let phone = normalize_phone(&request.phone, &self.phone_rules)?;
        Ok(StkPushRequest {
            phone,
            amount,
            account: request.reference.trim().to_string(),
            description: request.description.trim().to_string(),
        })
    }

    /// Send exactly one initiation request. Never retries.
    pub async fn initiate(&self, request: &StkPushRequest) -> InitiationOutcome {
        match self.gateway.initiate(request).await {
            Ok(response) => match response.tracking_token() {
                Some(token) => {
                    info!(
                        gateway = self.gateway.name(),
                        phone = %mask_phone_number(&request.phone),
                        tracking_token = token,
                        "payment initiation accepted"
                    );
                    InitiationOutcome::Accepted {
                        tracking_token: token.to_string(),
                    }
                }
                None => {
                    let reason = response
                        .rejection_message()
                        .unwrap_or(REJECTION_FALLBACK_REASON)
                        .to_string();
                    warn!(
                        gateway = self.gateway.name(),
                        accepted = response.success,
                        reason = %reason,
                        "payment initiation rejected"
                    );
                    InitiationOutcome::Rejected { reason }
                }
            },
            Err(e) if e.is_retryable() => {
                warn!(gateway = self.gateway.name(), error = %e, "payment initiation unreachable");
                InitiationOutcome::Unreachable {
                    reason: NETWORK_FAILURE_REASON.to_string(),
                }
            }
            Err(e) => {
                warn!(gateway = self.gateway.name(), error = %e, "payment initiation failed");
                InitiationOutcome::Rejected {
                    reason: e.user_message(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::error::PaymentError;
    use crate::payments::types::{InitiateResponse, PollOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedGateway {
        reply: PaymentResult<InitiateResponse>,
        calls: AtomicUsize,
        last_request: Mutex<Option<StkPushRequest>>,
    }

    impl ScriptedGateway {
        fn new(reply: PaymentResult<InitiateResponse>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn initiate(&self, request: &StkPushRequest) -> PaymentResult<InitiateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.reply.clone()
        }

        async fn query_status(&self, _tracking_token: &str) -> PaymentResult<PollOutcome> {
            Ok(PollOutcome::Pending)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn request(phone: &str, amount: i64) -> PaymentRequest {
        PaymentRequest {
            phone: phone.to_string(),
            amount,
            reference: " RCPT-9 ".to_string(),
            description: "Pump 2 diesel".to_string(),
        }
    }

    #[test]
    fn prepare_normalizes_inputs() {
        let gateway = ScriptedGateway::new(Ok(InitiateResponse::default()));
        let initiator = PaymentInitiator::new(gateway.clone(), PhoneConfig::default());
        let prepared = initiator
            .prepare(&request("0712 345 678", 1500))
            .expect("valid request");
        assert_eq!(prepared.phone, "254712345678");
        assert_eq!(prepared.amount, 1500);
        assert_eq!(prepared.account, "RCPT-9");
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prepare_rejects_bad_amount_before_phone() {
        let gateway = ScriptedGateway::new(Ok(InitiateResponse::default()));
        let initiator = PaymentInitiator::new(gateway, PhoneConfig::default());
        let err = initiator
            .prepare(&request("123", 0))
            .expect_err("zero amount");
        assert!(matches!(
            err,
            PaymentError::ValidationError { ref field, .. } if field.as_deref() == Some("amount")
        ));
    }

    #[tokio::test]
    async fn accepted_response_yields_token() {
        let gateway = ScriptedGateway::new(Ok(InitiateResponse {
            success: true,
            checkout_request_id: Some("ws_CO_42".to_string()),
            message: None,
        }));
        let initiator = PaymentInitiator::new(gateway.clone(), PhoneConfig::default());
        let prepared = initiator.prepare(&request("0712345678", 10)).unwrap();

        let outcome = initiator.initiate(&prepared).await;
        assert_eq!(
            outcome,
            InitiationOutcome::Accepted {
                tracking_token: "ws_CO_42".to_string()
            }
        );
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.last_request.lock().unwrap().as_ref(),
            Some(&prepared)
        );
    }

    #[tokio::test]
    async fn rejected_response_uses_gateway_message() {
        let gateway = ScriptedGateway::new(Ok(InitiateResponse {
            success: false,
            checkout_request_id: None,
            message: Some("Invalid Access Token".to_string()),
        }));
        let initiator = PaymentInitiator::new(gateway, PhoneConfig::default());
        let prepared = initiator.prepare(&request("0712345678", 10)).unwrap();

        assert_eq!(
            initiator.initiate(&prepared).await,
            InitiationOutcome::Rejected {
                reason: "Invalid Access Token".to_string()
            }
        );
    }

    #[tokio::test]
    async fn accepted_without_token_falls_back() {
        let gateway = ScriptedGateway::new(Ok(InitiateResponse {
            success: true,
            checkout_request_id: None,
            message: None,
        }));
        let initiator = PaymentInitiator::new(gateway, PhoneConfig::default());
        let prepared = initiator.prepare(&request("0712345678", 10)).unwrap();

        assert_eq!(
            initiator.initiate(&prepared).await,
            InitiationOutcome::Rejected {
                reason: REJECTION_FALLBACK_REASON.to_string()
            }
        );
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable_and_not_retried() {
        let gateway = ScriptedGateway::new(Err(PaymentError::NetworkError {
            message: "connection refused".to_string(),
        }));
        let initiator = PaymentInitiator::new(gateway.clone(), PhoneConfig::default());
        let prepared = initiator.prepare(&request("0712345678", 10)).unwrap();

        assert_eq!(
            initiator.initiate(&prepared).await,
            InitiationOutcome::Unreachable {
                reason: NETWORK_FAILURE_REASON.to_string()
            }
        );
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }
}
