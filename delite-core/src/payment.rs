use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::booking::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub id: String, // Provider's ID
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),
    #[error("Payment provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Settle the amount owed for a booking
    async fn process_payment(
        &self,
        booking_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentReceipt, PaymentError>;
}
