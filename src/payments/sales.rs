//! Sale recording triggered by a confirmed M-Pesa payment.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::notice::PaymentNotice;
use crate::payments::observer::PaymentObserver;
use crate::payments::session::{PaymentSession, SessionState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Card,
}

/// Sale details captured by the sales form before payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    pub station_id: Uuid,
    pub pump_id: Uuid,
    pub attendant_id: Uuid,
    pub fuel_type: String,
    pub litres: f64,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: Uuid,
    pub station_id: Uuid,
    pub pump_id: Uuid,
    pub attendant_id: Uuid,
    pub fuel_type: String,
    pub litres: f64,
    pub amount: u64,
    pub payment_method: PaymentMethod,
    pub mpesa_receipt: Option<String>,
    pub reference: String,
    pub customer_phone: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl SaleRecord {
    /// Build the record for a succeeded M-Pesa session.
    pub fn from_mpesa(draft: &SaleDraft, session: &PaymentSession) -> PaymentResult<Self> {
        if session.state != SessionState::Succeeded {
            return Err(PaymentError::InvalidTransition {
                from: session.state,
                to: SessionState::Succeeded,
            });
        }
        if session.amount != draft.amount {
            return Err(PaymentError::ValidationError {
                message: format!(
                    "paid amount {} does not match sale amount {}",
                    session.amount, draft.amount
                ),
                field: Some("amount".to_string()),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            station_id: draft.station_id,
            pump_id: draft.pump_id,
            attendant_id: draft.attendant_id,
            fuel_type: draft.fuel_type.clone(),
            litres: draft.litres,
            amount: draft.amount,
            payment_method: PaymentMethod::Mpesa,
            mpesa_receipt: session.receipt_code.clone(),
            reference: session.reference.clone(),
            customer_phone: Some(session.phone.clone()),
            recorded_at: session.completed_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Write side of the sales table.
#[async_trait]
pub trait SalesRecorder: Send + Sync {
    async fn record_sale(&self, sale: SaleRecord) -> PaymentResult<()>;
}

/// Observer that records the drafted sale once its payment succeeds.
pub struct RecordSaleObserver {
    draft: SaleDraft,
    recorder: Arc<dyn SalesRecorder>,
}

impl RecordSaleObserver {
    pub fn new(draft: SaleDraft, recorder: Arc<dyn SalesRecorder>) -> Self {
        Self { draft, recorder }
    }
}

#[async_trait]
impl PaymentObserver for RecordSaleObserver {
    async fn on_succeeded(&self, session: &PaymentSession) {
        let sale = match SaleRecord::from_mpesa(&self.draft, session) {
            Ok(sale) => sale,
            Err(e) => {
                error!(session_id = %session.id, error = %e, "cannot build sale record");
                return;
            }
        };
        let sale_id = sale.id;
        match self.recorder.record_sale(sale).await {
            Ok(()) => info!(
                session_id = %session.id,
                sale_id = %sale_id,
                pump_id = %self.draft.pump_id,
                "sale recorded"
            ),
            Err(e) => error!(
                session_id = %session.id,
                error = %e,
                "failed to record sale after payment"
            ),
        }
    }

    async fn on_failed(&self, session: &PaymentSession, notice: &PaymentNotice) {
        warn!(
            session_id = %session.id,
            pump_id = %self.draft.pump_id,
            title = %notice.title,
            "sale not recorded, payment failed"
        );
    }
}
