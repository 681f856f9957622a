//! Payment session state machine.
//!
//! ```text
//! idle -> sending -> waiting -> succeeded
//!            |          |
//!            +--------> failed
//! succeeded | failed --reset--> idle
//! ```

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::StkPushRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TIMEOUT_REASON: &str =
    "No payment confirmation received in time. Check the customer's M-Pesa messages before retrying.";
pub const NETWORK_FAILURE_REASON: &str =
    "Network error. Please check your connection and try again.";
pub const REJECTION_FALLBACK_REASON: &str = "Failed to initiate M-Pesa payment";
pub const GATEWAY_FAILURE_FALLBACK_REASON: &str = "Payment failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Sending,
    Waiting,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Sending => "sending",
            SessionState::Waiting => "waiting",
            SessionState::Succeeded => "succeeded",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Gateway declined the initiation, or answered without a token.
    Rejected,
    /// Initiation request could not be completed.
    Network,
    /// Gateway reported the payment as failed.
    Gateway,
    /// Attempt budget exhausted.
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: Uuid,
    pub state: SessionState,
    pub tracking_token: Option<String>,
    pub phone: String,
    pub amount: u64,
    pub reference: String,
    pub description: String,
    pub attempt_count: u32,
    pub receipt_code: Option<String>,
    pub failure_reason: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for PaymentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            tracking_token: None,
            phone: String::new(),
            amount: 0,
            reference: String::new(),
            description: String::new(),
            attempt_count: 0,
            receipt_code: None,
            failure_reason: None,
            failure_kind: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn expect_state(&self, allowed: &[SessionState], to: SessionState) -> PaymentResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(PaymentError::InvalidTransition {
            from: self.state,
            to,
        })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn begin_sending(&mut self, request: &StkPushRequest) -> PaymentResult<()> {
        self.expect_state(&[SessionState::Idle], SessionState::Sending)?;
        self.phone = request.phone.clone();
        self.amount = request.amount;
        self.reference = request.account.clone();
        self.description = request.description.clone();
        self.state = SessionState::Sending;
        self.touch();
        Ok(())
    }

    pub fn mark_waiting(&mut self, tracking_token: &str) -> PaymentResult<()> {
        self.expect_state(&[SessionState::Sending], SessionState::Waiting)?;
        self.tracking_token = Some(tracking_token.to_string());
        self.state = SessionState::Waiting;
        self.touch();
        Ok(())
    }

    /// Count one status query; the session stays `waiting`.
    pub fn record_attempt(&mut self) -> PaymentResult<u32> {
        self.expect_state(&[SessionState::Waiting], SessionState::Waiting)?;
        self.attempt_count += 1;
        self.touch();
        Ok(self.attempt_count)
    }

    pub fn mark_succeeded(&mut self, receipt_code: &str) -> PaymentResult<()> {
        self.expect_state(&[SessionState::Waiting], SessionState::Succeeded)?;
        self.receipt_code = Some(receipt_code.to_string());
        self.state = SessionState::Succeeded;
        self.touch();
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn mark_failed(&mut self, kind: FailureKind, reason: &str) -> PaymentResult<()> {
        self.expect_state(
            &[SessionState::Sending, SessionState::Waiting],
            SessionState::Failed,
        )?;
        self.failure_kind = Some(kind);
        self.failure_reason = Some(reason.to_string());
        self.state = SessionState::Failed;
        self.touch();
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Return a terminal (or idle) session to `idle`, clearing every field.
    pub fn reset(&mut self) -> PaymentResult<()> {
        self.expect_state(
            &[
                SessionState::Idle,
                SessionState::Succeeded,
                SessionState::Failed,
            ],
            SessionState::Idle,
        )?;
        *self = Self::new();
        Ok(())
    }
}
