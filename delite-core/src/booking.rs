use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use delite_shared::Masked;
use std::str::FromStr;
use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::ValidationError(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::ValidationError(format!("unknown payment status '{}'", other))),
        }
    }
}

/// A confirmed reservation of `quantity` seats on one experience slot.
///
/// Pricing figures are copied in at booking time and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub experience_id: Uuid,
    pub experience_title: String,
    pub customer_name: String,
    pub customer_email: Masked<String>,
    pub selected_date: String,
    pub selected_time: String,
    pub quantity: u32,
    pub base_price: i64,
    pub subtotal: i64,
    pub taxes: i64,
    pub discount: i64,
    pub promo_code: Option<String>,
    pub total: i64,
    pub status: BookingStatus,
    pub reference_id: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public summary returned when a booking is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub id: Uuid,
    pub reference_id: String,
    pub experience_title: String,
    pub customer_name: String,
    pub selected_date: String,
    pub selected_time: String,
    pub quantity: u32,
    pub total: i64,
    pub status: BookingStatus,
}

impl Booking {
    pub fn confirmation(&self) -> BookingConfirmation {
        BookingConfirmation {
            id: self.id,
            reference_id: self.reference_id.clone(),
            experience_title: self.experience_title.clone(),
            customer_name: self.customer_name.clone(),
            selected_date: self.selected_date.clone(),
            selected_time: self.selected_time.clone(),
            quantity: self.quantity,
            total: self.total,
            status: self.status,
        }
    }
}
