use uuid::Uuid;
use crate::pii::Masked;

pub const BOOKING_CONFIRMED_TOPIC: &str = "booking.confirmed";

/// Emitted once a booking transaction has committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub reference_id: String,
    pub experience_id: Uuid,
    pub selected_date: String,
    pub selected_time: String,
    pub quantity: u32,
    pub total: i64,
    pub promo_code: Option<String>,
    pub customer_email: Masked<String>,
    pub timestamp: i64,
}
