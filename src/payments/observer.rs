use crate::payments::notice::PaymentNotice;
use crate::payments::session::PaymentSession;
use async_trait::async_trait;

/// Dependent action run once a session reaches a terminal state.
///
/// Called at most once per session, never after the session was disposed.
#[async_trait]
pub trait PaymentObserver: Send + Sync {
    async fn on_succeeded(&self, session: &PaymentSession);

    async fn on_failed(&self, session: &PaymentSession, notice: &PaymentNotice);
}
