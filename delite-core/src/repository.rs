use async_trait::async_trait;
use uuid::Uuid;
use delite_catalog::{Experience, ExperienceQuery, InventoryError, SlotKey};
use delite_promo::{PromoCode, PromoError};
use crate::booking::Booking;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Promo ledger error: {0}")]
    Promo(#[from] PromoError),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("Duplicate booking reference: {0}")]
    DuplicateReference(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read access to the experience catalog
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    async fn find_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError>;

    /// Active experiences matching the query, newest first
    async fn list_experiences(&self, query: &ExperienceQuery) -> Result<Vec<Experience>, StoreError>;
}

/// Read access to promo codes
#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError>;

    async fn list_active(&self) -> Result<Vec<PromoCode>, StoreError>;
}

/// Read access to committed bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_reference(&self, reference_id: &str) -> Result<Option<Booking>, StoreError>;
}

/// Opens booking transactions against a backend
#[async_trait]
pub trait BookingUnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError>;
}

/// One all-or-nothing booking unit.
///
/// Postgres keeps mutations private until `commit`. The in-memory backend
/// applies slot and promo counter changes immediately, so concurrent
/// transactions see reduced capacity at once, and undoes them on `rollback`
/// or when dropped without committing. Its bookings appear only on `commit`.
#[async_trait]
pub trait BookingTransaction: Send {
    async fn find_experience(&mut self, id: Uuid) -> Result<Option<Experience>, StoreError>;

    /// Atomically subtract `quantity` from a slot; `false` when the slot is
    /// missing or has too little capacity left.
    async fn decrement_slot(&mut self, key: &SlotKey, quantity: u32) -> Result<bool, StoreError>;

    async fn find_promo(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError>;

    /// Conditionally count one use of a promo; `false` once the limit is hit.
    async fn record_promo_usage(&mut self, code: &str) -> Result<bool, StoreError>;

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), InsertError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
