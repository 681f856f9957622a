use crate::config::PollerConfig;
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::PollOutcome;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    Completed { receipt_code: String },
    Failed { reason: Option<String> },
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Sequential, fixed-interval status poller with an attempt budget.
pub struct StatusPoller {
    gateway: Arc<dyn PaymentGateway>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: PollerConfig) -> Self {
        Self { gateway, config }
    }

    /// Poll `tracking_token` until a terminal outcome, the attempt budget, or
    /// cancellation.
    ///
    /// Each attempt waits one interval and then issues one query; the next
    /// attempt is only scheduled once the previous query resolved.
    /// `on_attempt` is called with the attempt number right before each query
    /// and returning `false` from it stops the run as cancelled. Transport
    /// errors count as pending.
    pub async fn run<F>(
        &self,
        tracking_token: &str,
        mut cancel_rx: watch::Receiver<bool>,
        mut on_attempt: F,
    ) -> PollVerdict
    where
        F: FnMut(u32) -> bool,
    {
        let interval = self.config.interval();

        for attempt in 1..=self.config.max_attempts {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    debug!(tracking_token, attempt, "status polling cancelled before query");
                    return PollVerdict::Cancelled;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            if !on_attempt(attempt) {
                return PollVerdict::Cancelled;
            }

            let result = tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    debug!(tracking_token, attempt, "status polling cancelled during query");
                    return PollVerdict::Cancelled;
                }
                result = self.gateway.query_status(tracking_token) => result,
            };

            match result {
                Ok(PollOutcome::Completed { receipt_code }) => {
                    info!(tracking_token, attempt, receipt_code = %receipt_code, "payment completed");
                    return PollVerdict::Completed { receipt_code };
                }
                Ok(PollOutcome::Failed { reason }) => {
                    info!(tracking_token, attempt, reason = ?reason, "payment failed at gateway");
                    return PollVerdict::Failed { reason };
                }
                Ok(PollOutcome::Pending) => {
                    debug!(tracking_token, attempt, "payment still pending");
                }
                Err(e) => {
                    // Indistinguishable from pending; an unreachable gateway
                    // surfaces only as a timeout.
                    warn!(tracking_token, attempt, error = %e, "status query failed, treating as pending");
                }
            }
        }

        warn!(
            tracking_token,
            attempts = self.config.max_attempts,
            "payment confirmation timed out"
        );
        PollVerdict::TimedOut {
            attempts: self.config.max_attempts,
        }
    }
}

/// Resolves once cancellation is requested or the sender is gone.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
