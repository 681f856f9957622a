use crate::payments::error::PaymentResult;
use crate::payments::types::{InitiateResponse, PollOutcome, StkPushRequest};
use async_trait::async_trait;

/// External payment endpoint consumed by the workflow.
///
/// `initiate` returns the gateway's verdict as data: a `success: false` body
/// is `Ok`, only transport or decoding problems are `Err`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: &StkPushRequest) -> PaymentResult<InitiateResponse>;

    async fn query_status(&self, tracking_token: &str) -> PaymentResult<PollOutcome>;

    fn name(&self) -> &'static str;
}
