pub mod events;

pub use events::{BookingConfirmedEvent, BOOKING_CONFIRMED_TOPIC};
