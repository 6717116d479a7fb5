pub mod booking;
pub mod events;
pub mod repository;
pub mod payment;

pub use booking::{Booking, BookingConfirmation, BookingStatus, PaymentStatus};
pub use events::{EventError, EventPublisher};
pub use payment::{PaymentAdapter, PaymentError, PaymentReceipt};
pub use repository::{
    BookingRepository, BookingTransaction, BookingUnitOfWork, ExperienceRepository, InsertError,
    PromoRepository, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}
