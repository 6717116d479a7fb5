pub mod validation;
pub mod reference;
pub mod orchestrator;
pub mod coordinator;

pub use validation::{BookingRequest, FieldError, ValidatedBooking};
pub use reference::{RandomReferenceGenerator, ReferenceGenerator};
pub use orchestrator::{PaymentOrchestrator, SimulatedPaymentAdapter};
pub use coordinator::{BookingCoordinator, BookingError};
