//! Reusable payment workflow: one STK push, then status polling, driving a
//! single [`PaymentSession`] per submission.

use crate::config::AppConfig;
use crate::logging::mask_phone_number;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::initiator::{InitiationOutcome, PaymentInitiator};
use crate::payments::notice::PaymentNotice;
use crate::payments::observer::PaymentObserver;
use crate::payments::poller::{cancelled, PollVerdict, StatusPoller};
use crate::payments::providers::MpesaGateway;
use crate::payments::session::{
    FailureKind, PaymentSession, SessionState, GATEWAY_FAILURE_FALLBACK_REASON, TIMEOUT_REASON,
};
use crate::payments::types::{PaymentRequest, StkPushRequest};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Session plus the disposal flag, guarded by the same channel lock so a
/// disposed session can never be written again.
#[derive(Debug)]
struct SessionSlot {
    session: PaymentSession,
    disposed: bool,
}

type SharedSlot = Arc<watch::Sender<SessionSlot>>;

/// Apply `change` unless the session was disposed. Returns whether it landed.
fn apply<F>(slot: &watch::Sender<SessionSlot>, change: F) -> bool
where
    F: FnOnce(&mut PaymentSession) -> PaymentResult<()>,
{
    slot.send_if_modified(|slot| {
        if slot.disposed {
            return false;
        }
        match change(&mut slot.session) {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id = %slot.session.id, error = %e, "session update refused");
                false
            }
        }
    })
}

#[derive(Clone)]
pub struct PaymentWorkflow {
    initiator: Arc<PaymentInitiator>,
    poller: Arc<StatusPoller>,
    observer: Option<Arc<dyn PaymentObserver>>,
}

impl PaymentWorkflow {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: &AppConfig) -> Self {
        Self {
            initiator: Arc::new(PaymentInitiator::new(
                gateway.clone(),
                config.phone.clone(),
            )),
            poller: Arc::new(StatusPoller::new(gateway, config.poller.clone())),
            observer: None,
        }
    }

    /// Build against the HTTP gateway described by the environment.
    pub fn from_env() -> PaymentResult<Self> {
        let config = AppConfig::from_env()
            .and_then(|config| config.validate().map(|_| config))
            .map_err(|e| PaymentError::ValidationError {
                message: e.to_string(),
                field: Some("config".to_string()),
            })?;
        let gateway = MpesaGateway::new(config.gateway.clone())?;
        Ok(Self::new(Arc::new(gateway), &config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn PaymentObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate `request` and start a new session.
    ///
    /// Invalid input returns `ValidationError` without touching the network
    /// and without creating a session. Otherwise the returned handle starts in
    /// `sending` and is driven by a background task; must be called from
    /// within a tokio runtime.
    pub fn submit(&self, request: PaymentRequest) -> PaymentResult<SessionHandle> {
        let prepared = self.initiator.prepare(&request).map_err(|e| {
            debug!(error = %e, "payment request rejected locally");
            e
        })?;

        let mut session = PaymentSession::new();
        session.begin_sending(&prepared)?;
        let session_id = session.id;

        info!(
            session_id = %session_id,
            phone = %mask_phone_number(&prepared.phone),
            amount = prepared.amount,
            reference = %prepared.account,
            "payment session started"
        );

        let (slot_tx, slot_rx) = watch::channel(SessionSlot {
            session,
            disposed: false,
        });
        let slot = Arc::new(slot_tx);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let driver = SessionDriver {
            initiator: self.initiator.clone(),
            poller: self.poller.clone(),
            observer: self.observer.clone(),
            slot: slot.clone(),
            cancel_rx,
        };
        let task = tokio::spawn(
            driver
                .run(prepared)
                .instrument(info_span!("payment_session", session_id = %session_id)),
        );

        Ok(SessionHandle {
            slot,
            slot_rx,
            cancel_tx,
            task,
        })
    }
}

struct SessionDriver {
    initiator: Arc<PaymentInitiator>,
    poller: Arc<StatusPoller>,
    observer: Option<Arc<dyn PaymentObserver>>,
    slot: SharedSlot,
    cancel_rx: watch::Receiver<bool>,
}

impl SessionDriver {
    async fn run(mut self, request: StkPushRequest) {
        let outcome = tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel_rx) => {
                debug!("session disposed while sending");
                return;
            }
            outcome = self.initiator.initiate(&request) => outcome,
        };

        let tracking_token = match outcome {
            InitiationOutcome::Accepted { tracking_token } => {
                if !apply(&self.slot, |s| s.mark_waiting(&tracking_token)) {
                    return;
                }
                tracking_token
            }
            InitiationOutcome::Rejected { reason } => {
                self.finish_failed(FailureKind::Rejected, &reason).await;
                return;
            }
            InitiationOutcome::Unreachable { reason } => {
                self.finish_failed(FailureKind::Network, &reason).await;
                return;
            }
        };

        let slot = self.slot.clone();
        let verdict = self
            .poller
            .run(&tracking_token, self.cancel_rx.clone(), |_| {
                apply(&slot, |s| s.record_attempt().map(|_| ()))
            })
            .await;

        match verdict {
            PollVerdict::Completed { receipt_code } => self.finish_succeeded(&receipt_code).await,
            PollVerdict::Failed { reason } => {
                let reason = reason.as_deref().unwrap_or(GATEWAY_FAILURE_FALLBACK_REASON);
                self.finish_failed(FailureKind::Gateway, reason).await;
            }
            PollVerdict::TimedOut { .. } => {
                self.finish_failed(FailureKind::Timeout, TIMEOUT_REASON)
                    .await
            }
            PollVerdict::Cancelled => debug!("session disposed while waiting"),
        }
    }

    fn snapshot(&self) -> PaymentSession {
        self.slot.borrow().session.clone()
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    async fn finish_succeeded(&self, receipt_code: &str) {
        if !apply(&self.slot, |s| s.mark_succeeded(receipt_code)) {
            return;
        }
        let session = self.snapshot();
        info!(
            receipt_code,
            attempts = session.attempt_count,
            "payment session succeeded"
        );

        if let Some(observer) = &self.observer {
            if !self.is_cancelled() {
                observer.on_succeeded(&session).await;
            }
        }
    }

    async fn finish_failed(&self, kind: FailureKind, reason: &str) {
        if !apply(&self.slot, |s| s.mark_failed(kind, reason)) {
            return;
        }
        let session = self.snapshot();
        warn!(
            failure_kind = ?kind,
            reason,
            attempts = session.attempt_count,
            "payment session failed"
        );

        if let (Some(observer), Some(notice)) =
            (&self.observer, PaymentNotice::for_session(&session))
        {
            if !self.is_cancelled() {
                observer.on_failed(&session, &notice).await;
            }
        }
    }
}

/// Owner's view of one payment session.
///
/// Dropping the handle disposes the session.
pub struct SessionHandle {
    slot: SharedSlot,
    slot_rx: watch::Receiver<SessionSlot>,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.slot_rx.borrow().session.state
    }

    pub fn snapshot(&self) -> PaymentSession {
        self.slot_rx.borrow().session.clone()
    }

    pub fn notice(&self) -> Option<PaymentNotice> {
        PaymentNotice::for_session(&self.slot_rx.borrow().session)
    }

    pub fn is_disposed(&self) -> bool {
        self.slot_rx.borrow().disposed
    }

    /// Whether the background driver has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until `predicate` holds, the session is terminal, or it was
    /// disposed; returns the snapshot at that point.
    pub async fn wait_until<P>(&mut self, predicate: P) -> PaymentSession
    where
        P: Fn(&PaymentSession) -> bool,
    {
        loop {
            {
                let slot = self.slot_rx.borrow_and_update();
                if slot.disposed || slot.session.is_terminal() || predicate(&slot.session) {
                    return slot.session.clone();
                }
            }
            if self.slot_rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    pub async fn wait_for_terminal(&mut self) -> PaymentSession {
        self.wait_until(PaymentSession::is_terminal).await
    }

    /// Stop polling and freeze the session. Idempotent.
    pub fn dispose(&mut self) {
        let newly_disposed = self.slot.send_if_modified(|slot| {
            if slot.disposed {
                return false;
            }
            slot.disposed = true;
            true
        });
        self.cancel_tx.send_replace(true);
        if newly_disposed {
            debug!(session_id = %self.slot.borrow().session.id, "payment session disposed");
        }
    }

    /// Return a terminal session to `idle` with every field cleared.
    pub fn reset(&mut self) -> PaymentResult<()> {
        let mut result = Ok(());
        self.slot.send_if_modified(|slot| match slot.session.reset() {
            Ok(()) => true,
            Err(e) => {
                result = Err(e);
                false
            }
        });
        result
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot_rx.borrow();
        f.debug_struct("SessionHandle")
            .field("session_id", &slot.session.id)
            .field("state", &slot.session.state)
            .field("disposed", &slot.disposed)
            .finish()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
