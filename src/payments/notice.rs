use crate::payments::error::PaymentError;
use crate::payments::session::{FailureKind, PaymentSession, SessionState};
use serde::{Deserialize, Serialize};

/// Short title plus description, as shown in a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotice {
    pub title: String,
    pub description: String,
}

impl PaymentNotice {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn from_error(err: &PaymentError) -> Self {
        let title = match err {
            PaymentError::ValidationError { field, .. } => match field.as_deref() {
                Some("phone") => "Invalid phone number",
                Some("amount") => "Invalid amount",
                _ => "Invalid payment details",
            },
            PaymentError::NetworkError { .. } => "Network error",
            PaymentError::ProviderError { .. } => "Payment error",
            PaymentError::InvalidTransition { .. } => "Payment in progress",
        };
        Self::new(title, &err.user_message())
    }

    /// Notice for a session that has something to report, `None` otherwise.
    pub fn for_session(session: &PaymentSession) -> Option<Self> {
        match session.state {
            SessionState::Idle => None,
            SessionState::Sending => Some(Self::new(
                "Sending payment request",
                "Contacting M-Pesa...",
            )),
            SessionState::Waiting => Some(Self::new(
                "Waiting for customer",
                "Ask the customer to enter their M-Pesa PIN on their phone.",
            )),
            SessionState::Succeeded => Some(Self::new(
                "Payment received",
                &format!(
                    "M-Pesa receipt {}",
                    session.receipt_code.as_deref().unwrap_or("-")
                ),
            )),
            SessionState::Failed => {
                let title = match session.failure_kind {
                    Some(FailureKind::Rejected) => "Payment request failed",
                    Some(FailureKind::Network) => "Network error",
                    Some(FailureKind::Timeout) => "Payment timed out",
                    Some(FailureKind::Gateway) | None => "Payment failed",
                };
                Some(Self::new(
                    title,
                    session.failure_reason.as_deref().unwrap_or("Payment failed"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::StkPushRequest;

    fn failed(kind: FailureKind, reason: &str) -> PaymentSession {
        let mut session = PaymentSession::new();
        session
            .begin_sending(&StkPushRequest {
                phone: "254712345678".to_string(),
                amount: 50,
                account: "r".to_string(),
                description: "d".to_string(),
            })
            .unwrap();
        session.mark_waiting("ws_CO_1").unwrap();
        session.mark_failed(kind, reason).unwrap();
        session
    }

    #[test]
    fn validation_errors_name_the_field() {
        let notice = PaymentNotice::from_error(&PaymentError::validation("invalid phone", "phone"));
        assert_eq!(notice, PaymentNotice::new("Invalid phone number", "invalid phone"));

        let notice =
            PaymentNotice::from_error(&PaymentError::validation("invalid amount", "amount"));
        assert_eq!(notice.title, "Invalid amount");
    }

    #[test]
    fn failed_session_notice_uses_reason() {
        let notice = PaymentNotice::for_session(&failed(FailureKind::Gateway, "cancelled by user"))
            .expect("failed sessions have a notice");
        assert_eq!(notice, PaymentNotice::new("Payment failed", "cancelled by user"));

        let notice = PaymentNotice::for_session(&failed(FailureKind::Timeout, "too slow"))
            .expect("failed sessions have a notice");
        assert_eq!(notice.title, "Payment timed out");
    }

    #[test]
    fn idle_session_has_no_notice() {
        assert!(PaymentNotice::for_session(&PaymentSession::new()).is_none());
    }
}
