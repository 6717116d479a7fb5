use delite_core::payment::{PaymentAdapter, PaymentError, PaymentReceipt};
use delite_core::PaymentStatus;
use uuid::Uuid;
use std::sync::Arc;

pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>, currency: impl Into<String>) -> Self {
        Self {
            adapter,
            currency: currency.into(),
        }
    }

    /// Charge a booking total. Anything short of a completed payment is an error.
    pub async fn settle(&self, booking_id: Uuid, amount: i64) -> Result<PaymentReceipt, PaymentError> {
        let receipt = self.adapter.process_payment(booking_id, amount, &self.currency).await?;

        if receipt.status != PaymentStatus::Completed {
            return Err(PaymentError::Declined(format!(
                "payment {} ended as {}",
                receipt.id,
                receipt.status.as_str()
            )));
        }

        Ok(receipt)
    }
}

/// Payment provider stand-in: every charge completes immediately
pub struct SimulatedPaymentAdapter;

#[async_trait::async_trait]
impl PaymentAdapter for SimulatedPaymentAdapter {
    async fn process_payment(
        &self,
        booking_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        Ok(PaymentReceipt {
            id: format!("sim_pay_{}", booking_id.simple()),
            booking_id,
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::Completed,
            created_at: chrono::Utc::now(),
        })
    }
}
