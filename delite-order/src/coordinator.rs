use crate::orchestrator::PaymentOrchestrator;
use crate::reference::{RandomReferenceGenerator, ReferenceGenerator};
use crate::validation::{BookingRequest, FieldError, ValidatedBooking};
use delite_catalog::{PricingEngine, SlotKey};
use delite_core::payment::PaymentError;
use delite_core::{
    Booking, BookingStatus, BookingTransaction, BookingUnitOfWork, EventPublisher, InsertError,
    PaymentStatus, StoreError,
};
use delite_shared::models::{BookingConfirmedEvent, BOOKING_CONFIRMED_TOPIC};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_REFERENCE_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Experience not found: {0}")]
    ExperienceNotFound(Uuid),

    #[error("Selected time slot not available or insufficient slots")]
    SlotUnavailable,

    #[error("Payment failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("No unique booking reference after {0} attempts")]
    ReferenceExhausted(u32),
}

/// Runs the booking transaction: inventory, promo usage, pricing, payment
/// and the booking record either all land or none do.
pub struct BookingCoordinator {
    uow: Arc<dyn BookingUnitOfWork>,
    pricing: PricingEngine,
    payments: PaymentOrchestrator,
    references: Arc<dyn ReferenceGenerator>,
    events: Arc<dyn EventPublisher>,
    reference_attempts: u32,
    event_topic: String,
}

impl BookingCoordinator {
    pub fn new(
        uow: Arc<dyn BookingUnitOfWork>,
        pricing: PricingEngine,
        payments: PaymentOrchestrator,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            uow,
            pricing,
            payments,
            references: Arc::new(RandomReferenceGenerator),
            events,
            reference_attempts: DEFAULT_REFERENCE_ATTEMPTS,
            event_topic: BOOKING_CONFIRMED_TOPIC.to_string(),
        }
    }

    pub fn with_reference_generator(mut self, references: Arc<dyn ReferenceGenerator>) -> Self {
        self.references = references;
        self
    }

    pub fn with_reference_attempts(mut self, attempts: u32) -> Self {
        self.reference_attempts = attempts.max(1);
        self
    }

    pub fn with_event_topic(mut self, topic: impl Into<String>) -> Self {
        self.event_topic = topic.into();
        self
    }

    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let request = request.validate().map_err(BookingError::Validation)?;

        let mut tx = self.uow.begin().await?;
        match self.run(tx.as_mut(), &request).await {
            Ok(booking) => {
                tx.commit().await?;
                tracing::info!(
                    "Booking {} confirmed: {} x{} on {} {} (total {})",
                    booking.reference_id,
                    booking.experience_id,
                    booking.quantity,
                    booking.selected_date,
                    booking.selected_time,
                    booking.total
                );
                self.publish_confirmed(&booking).await;
                Ok(booking)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Booking rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut dyn BookingTransaction,
        request: &ValidatedBooking,
    ) -> Result<Booking, BookingError> {
        let experience = tx
            .find_experience(request.experience_id)
            .await?
            .ok_or(BookingError::ExperienceNotFound(request.experience_id))?;

        let slot = SlotKey::new(experience.id, request.selected_date.clone(), request.selected_time.clone());
        if !tx.decrement_slot(&slot, request.quantity).await? {
            tracing::warn!("Slot {} cannot take {} more guest(s)", slot, request.quantity);
            return Err(BookingError::SlotUnavailable);
        }

        let subtotal = self.pricing.subtotal(experience.price, request.quantity);
        let (discount, promo_code) = self.apply_promo(tx, request.promo_code.as_deref(), subtotal).await?;
        let price = self.pricing.calculate_total(experience.price, request.quantity, discount);

        let now = Utc::now();
        let mut booking = Booking {
            id: Uuid::new_v4(),
            experience_id: experience.id,
            experience_title: experience.title.clone(),
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            selected_date: request.selected_date.clone(),
            selected_time: request.selected_time.clone(),
            quantity: request.quantity,
            base_price: price.base_price,
            subtotal: price.subtotal,
            taxes: price.taxes,
            discount: price.discount,
            promo_code,
            total: price.total,
            status: BookingStatus::Pending,
            reference_id: String::new(),
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let receipt = self.payments.settle(booking.id, booking.total).await?;
        booking.payment_status = receipt.status;
        booking.status = BookingStatus::Confirmed;

        self.insert_with_unique_reference(tx, &mut booking).await?;
        Ok(booking)
    }

    /// Discount for a supplied code. Unknown, expired, exhausted or
    /// below-minimum codes yield no discount instead of an error.
    async fn apply_promo(
        &self,
        tx: &mut dyn BookingTransaction,
        code: Option<&str>,
        subtotal: i64,
    ) -> Result<(i64, Option<String>), StoreError> {
        let Some(code) = code else {
            return Ok((0, None));
        };

        let Some(promo) = tx.find_promo(code).await? else {
            tracing::warn!("Unknown promo code {}; booking continues without discount", code);
            return Ok((0, None));
        };

        let discount = match promo.evaluate(subtotal, Utc::now()) {
            Ok(discount) => discount,
            Err(reason) => {
                tracing::warn!("Promo {} not applied: {}", promo.code, reason);
                return Ok((0, None));
            }
        };

        if !tx.record_promo_usage(&promo.code).await? {
            tracing::warn!("Promo {} hit its usage limit mid-booking; no discount applied", promo.code);
            return Ok((0, None));
        }

        tracing::debug!("Promo {} applied: discount {} on subtotal {}", promo.code, discount, subtotal);
        Ok((discount, Some(promo.code)))
    }

    async fn insert_with_unique_reference(
        &self,
        tx: &mut dyn BookingTransaction,
        booking: &mut Booking,
    ) -> Result<(), BookingError> {
        for attempt in 1..=self.reference_attempts {
            booking.reference_id = self.references.generate();
            match tx.insert_booking(booking).await {
                Ok(()) => return Ok(()),
                Err(InsertError::DuplicateReference(reference)) => {
                    tracing::warn!(
                        "Booking reference {} already taken (attempt {}/{})",
                        reference,
                        attempt,
                        self.reference_attempts
                    );
                }
                Err(InsertError::Store(e)) => return Err(e.into()),
            }
        }

        tracing::error!("Exhausted {} booking reference attempts", self.reference_attempts);
        Err(BookingError::ReferenceExhausted(self.reference_attempts))
    }

    async fn publish_confirmed(&self, booking: &Booking) {
        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            reference_id: booking.reference_id.clone(),
            experience_id: booking.experience_id,
            selected_date: booking.selected_date.clone(),
            selected_time: booking.selected_time.clone(),
            quantity: booking.quantity,
            total: booking.total,
            promo_code: booking.promo_code.clone(),
            customer_email: booking.customer_email.clone(),
            timestamp: Utc::now().timestamp(),
        };

        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize booking event {}: {}", booking.reference_id, e);
                return;
            }
        };

        if let Err(e) = self
            .events
            .publish(&self.event_topic, &booking.reference_id, &payload)
            .await
        {
            tracing::warn!("Booking {} committed but event was not published: {}", booking.reference_id, e);
        }
    }
}
