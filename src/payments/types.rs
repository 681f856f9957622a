use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Payment as entered by the operator, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub phone: String,
    pub amount: i64,
    pub reference: String,
    pub description: String,
}

/// Validated STK-push body sent to the initiation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushRequest {
    pub phone: String,
    pub amount: u64,
    pub account: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub checkout_request_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InitiateResponse {
    /// Tracking token, only when the gateway accepted the request.
    pub fn tracking_token(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.checkout_request_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn rejection_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Classified result of one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { receipt_code: String },
    Failed { reason: Option<String> },
    Pending,
}

impl PollOutcome {
    /// Classify a status payload. Unknown shapes, and `completed` without a
    /// receipt number, are pending.
    pub fn from_json(payload: &JsonValue) -> Self {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let status = text("status").map(|s| s.to_lowercase());
        match status.as_deref() {
            Some("completed") => match text("mpesaReceiptNumber") {
                Some(receipt_code) => PollOutcome::Completed { receipt_code },
                None => PollOutcome::Pending,
            },
            Some("failed") => PollOutcome::Failed {
                reason: text("resultDesc"),
            },
            _ => PollOutcome::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}
