use async_trait::async_trait;
use uuid::Uuid;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use delite_catalog::{Experience, ExperienceQuery, SlotInventory, SlotKey};
use delite_promo::{PromoCode, PromoLedger};
use delite_core::{
    Booking, BookingRepository, BookingTransaction, BookingUnitOfWork, ExperienceRepository,
    InsertError, PromoRepository, StoreError,
};

/// Process-local backend for development and tests.
///
/// Capacity lives in a [`SlotInventory`], promo usage in a [`PromoLedger`].
/// A transaction applies each mutation immediately and records how to undo
/// it; commit drops the undo log, anything else replays it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    experiences: RwLock<HashMap<Uuid, Experience>>,
    inventory: SlotInventory,
    promos: PromoLedger,
    bookings: Mutex<HashMap<String, BookingEntry>>,
}

struct BookingEntry {
    booking: Booking,
    committed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_experience(&self, experience: Experience) -> Result<(), StoreError> {
        experience
            .validate()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.inner.inventory.register_experience(&experience)?;

        let mut experiences = self.inner.experiences.write().map_err(|_| StoreError::LockPoisoned)?;
        experiences.insert(experience.id, experience);
        Ok(())
    }

    pub fn add_promo(&self, promo: PromoCode) -> Result<(), StoreError> {
        self.inner.promos.insert(promo)?;
        Ok(())
    }

    pub fn available_slots(&self, key: &SlotKey) -> Result<Option<i32>, StoreError> {
        Ok(self.inner.inventory.get(key)?.map(|counter| counter.available_slots))
    }

    pub fn promo_used_count(&self, code: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.inner.promos.find_by_code(code)?.map(|promo| promo.used_count))
    }

    pub fn valid_promo_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.promos.valid_count(chrono::Utc::now())?)
    }

    /// Number of committed bookings
    pub fn booking_count(&self) -> Result<usize, StoreError> {
        let bookings = self.inner.bookings.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bookings.values().filter(|entry| entry.committed).count())
    }
}

impl MemoryInner {
    fn find_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        let experience = {
            let experiences = self.experiences.read().map_err(|_| StoreError::LockPoisoned)?;
            experiences.get(&id).cloned()
        };
        experience.map(|e| self.with_live_counts(e)).transpose()
    }

    /// Copy current inventory counters into a catalog document
    fn with_live_counts(&self, mut experience: Experience) -> Result<Experience, StoreError> {
        let id = experience.id;
        for date in experience.available_dates.iter_mut() {
            for slot in date.time_slots.iter_mut() {
                let key = SlotKey::new(id, date.date.clone(), slot.time.clone());
                if let Some(counter) = self.inventory.get(&key)? {
                    slot.available_slots = counter.available_slots;
                }
            }
        }
        Ok(experience)
    }
}

#[async_trait]
impl ExperienceRepository for MemoryStore {
    async fn find_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        self.inner.find_experience(id)
    }

    async fn list_experiences(&self, query: &ExperienceQuery) -> Result<Vec<Experience>, StoreError> {
        let mut matching: Vec<Experience> = {
            let experiences = self.inner.experiences.read().map_err(|_| StoreError::LockPoisoned)?;
            experiences.values().filter(|e| query.matches(e)).cloned().collect()
        };
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        matching
            .into_iter()
            .map(|e| self.inner.with_live_counts(e))
            .collect()
    }
}

#[async_trait]
impl PromoRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.inner.promos.find_by_code(code)?)
    }

    async fn list_active(&self) -> Result<Vec<PromoCode>, StoreError> {
        Ok(self.inner.promos.list_active()?)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_by_reference(&self, reference_id: &str) -> Result<Option<Booking>, StoreError> {
        let bookings = self.inner.bookings.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bookings
            .get(reference_id)
            .filter(|entry| entry.committed)
            .map(|entry| entry.booking.clone()))
    }
}

#[async_trait]
impl BookingUnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            store: self.inner.clone(),
            undo: Vec::new(),
            finished: false,
        }))
    }
}

enum Undo {
    RestoreSlot(SlotKey, u32),
    ReleasePromo(String),
    RemoveBooking(String),
}

pub struct MemoryTransaction {
    store: Arc<MemoryInner>,
    undo: Vec<Undo>,
    finished: bool,
}

impl MemoryTransaction {
    /// Replay the undo log newest-first. Keeps going past failures and
    /// reports the first one.
    fn unwind(&mut self) -> Result<(), StoreError> {
        self.finished = true;
        let mut first_error = None;

        while let Some(step) = self.undo.pop() {
            let result = match &step {
                Undo::RestoreSlot(key, quantity) => self
                    .store
                    .inventory
                    .restore(key, *quantity)
                    .map_err(StoreError::from),
                Undo::ReleasePromo(code) => self
                    .store
                    .promos
                    .release_usage(code)
                    .map_err(StoreError::from),
                Undo::RemoveBooking(reference) => self
                    .store
                    .bookings
                    .lock()
                    .map(|mut bookings| {
                        bookings.remove(reference);
                    })
                    .map_err(|_| StoreError::LockPoisoned),
            };

            if let Err(e) = result {
                tracing::error!("Failed to undo booking step: {}", e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn find_experience(&mut self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        self.store.find_experience(id)
    }

    async fn decrement_slot(&mut self, key: &SlotKey, quantity: u32) -> Result<bool, StoreError> {
        let applied = self.store.inventory.try_decrement(key, quantity)?;
        if applied {
            self.undo.push(Undo::RestoreSlot(key.clone(), quantity));
        }
        Ok(applied)
    }

    async fn find_promo(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.store.promos.find_by_code(code)?)
    }

    async fn record_promo_usage(&mut self, code: &str) -> Result<bool, StoreError> {
        let applied = self.store.promos.try_record_usage(code)?;
        if applied {
            self.undo.push(Undo::ReleasePromo(code.to_string()));
        }
        Ok(applied)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), InsertError> {
        let mut bookings = self.store.bookings.lock().map_err(|_| StoreError::LockPoisoned)?;

        // Uncommitted entries hold their reference too
        if bookings.contains_key(&booking.reference_id) {
            return Err(InsertError::DuplicateReference(booking.reference_id.clone()));
        }

        bookings.insert(
            booking.reference_id.clone(),
            BookingEntry {
                booking: booking.clone(),
                committed: false,
            },
        );
        drop(bookings);

        self.undo.push(Undo::RemoveBooking(booking.reference_id.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        {
            let mut bookings = this.store.bookings.lock().map_err(|_| StoreError::LockPoisoned)?;
            for step in &this.undo {
                if let Undo::RemoveBooking(reference) = step {
                    if let Some(entry) = bookings.get_mut(reference) {
                        entry.committed = true;
                    }
                }
            }
        }

        this.undo.clear();
        this.finished = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        this.unwind()
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Discarding unfinished booking transaction ({} step(s))", self.undo.len());
            let _ = self.unwind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use delite_core::{BookingStatus, PaymentStatus};
    use delite_shared::Masked;
    use serde_json::json;

    const DATE: &str = "2026-11-02";
    const TIME: &str = "07:00 am";

    fn experience(available: i32) -> Experience {
        serde_json::from_value(json!({
            "title": "Nandi Hills Sunrise",
            "location": "Bangalore",
            "description": "Sunrise trek.",
            "price": 899,
            "image": "nandi.jpg",
            "availableDates": [{
                "date": DATE,
                "timeSlots": [{ "time": TIME, "availableSlots": available, "maxSlots": 10 }]
            }]
        }))
        .unwrap()
    }

    fn promo() -> PromoCode {
        serde_json::from_value(json!({
            "code": "FLAT100",
            "discountType": "fixed",
            "discountValue": 100,
            "validUntil": "2099-01-01T00:00:00Z",
            "usageLimit": 5
        }))
        .unwrap()
    }

    fn booking(experience_id: Uuid, reference: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            experience_id,
            experience_title: "Nandi Hills Sunrise".to_string(),
            customer_name: "Ravi".to_string(),
            customer_email: Masked("ravi@example.com".to_string()),
            selected_date: DATE.to_string(),
            selected_time: TIME.to_string(),
            quantity: 1,
            base_price: 899,
            subtotal: 899,
            taxes: 45,
            discount: 0,
            promo_code: None,
            total: 944,
            status: BookingStatus::Confirmed,
            reference_id: reference.to_string(),
            payment_status: PaymentStatus::Completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> (MemoryStore, Uuid, SlotKey) {
        let store = MemoryStore::new();
        let experience = experience(3);
        let id = experience.id;
        store.add_experience(experience).unwrap();
        store.add_promo(promo()).unwrap();
        (store, id, SlotKey::new(id, DATE, TIME))
    }

    #[tokio::test]
    async fn test_commit_publishes_all_effects() {
        let (store, id, key) = seeded();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.decrement_slot(&key, 2).await.unwrap());
        assert!(tx.record_promo_usage("flat100").await.unwrap());
        tx.insert_booking(&booking(id, "AAAA1111")).await.unwrap();

        // Not visible before commit
        assert!(store.find_by_reference("AAAA1111").await.unwrap().is_none());
        tx.commit().await.unwrap();

        assert_eq!(store.available_slots(&key).unwrap(), Some(1));
        assert_eq!(store.promo_used_count("FLAT100").unwrap(), Some(1));
        assert!(store.find_by_reference("AAAA1111").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_undoes_all_effects() {
        let (store, id, key) = seeded();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.decrement_slot(&key, 2).await.unwrap());
        assert!(tx.record_promo_usage("FLAT100").await.unwrap());
        tx.insert_booking(&booking(id, "BBBB2222")).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.available_slots(&key).unwrap(), Some(3));
        assert_eq!(store.promo_used_count("FLAT100").unwrap(), Some(0));
        assert!(store.find_by_reference("BBBB2222").await.unwrap().is_none());
        assert_eq!(store.booking_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_uncommitted_decrement_holds_capacity_until_rollback() {
        let (store, _, key) = seeded();

        let mut holder = store.begin().await.unwrap();
        assert!(holder.decrement_slot(&key, 3).await.unwrap());

        let mut other = store.begin().await.unwrap();
        assert!(!other.decrement_slot(&key, 1).await.unwrap());
        other.rollback().await.unwrap();

        holder.rollback().await.unwrap();
        assert_eq!(store.available_slots(&key).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_discarded() {
        let (store, _, key) = seeded();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.decrement_slot(&key, 3).await.unwrap());
            assert_eq!(store.available_slots(&key).unwrap(), Some(0));
        }

        assert_eq!(store.available_slots(&key).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let (store, id, _) = seeded();

        let mut first = store.begin().await.unwrap();
        first.insert_booking(&booking(id, "CCCC3333")).await.unwrap();

        // Pending reservation already owns the reference
        let mut second = store.begin().await.unwrap();
        let err = second.insert_booking(&booking(id, "CCCC3333")).await.unwrap_err();
        assert!(matches!(err, InsertError::DuplicateReference(r) if r == "CCCC3333"));

        first.commit().await.unwrap();
        second.rollback().await.unwrap();
        assert_eq!(store.booking_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_experience_reflects_live_counts() {
        let (store, id, key) = seeded();

        let mut tx = store.begin().await.unwrap();
        tx.decrement_slot(&key, 1).await.unwrap();
        tx.commit().await.unwrap();

        let experience = store.find_experience(id).await.unwrap().unwrap();
        assert_eq!(experience.find_slot(DATE, TIME).unwrap().available_slots, 2);
    }

    #[tokio::test]
    async fn test_listing_filters_and_orders() {
        let store = MemoryStore::new();
        let mut older = experience(3);
        older.title = "Coffee Trail".to_string();
        older.location = "Coorg".to_string();
        older.created_at = Utc::now() - chrono::Duration::days(1);
        let newer = experience(3);
        let mut hidden = experience(3);
        hidden.is_active = false;

        store.add_experience(older).unwrap();
        store.add_experience(newer).unwrap();
        store.add_experience(hidden).unwrap();

        let all = store.list_experiences(&ExperienceQuery::default()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Nandi Hills Sunrise", "Coffee Trail"]);

        let coorg = ExperienceQuery { search: None, location: Some("coorg".to_string()) };
        assert_eq!(store.list_experiences(&coorg).await.unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_experience_rejected() {
        let store = MemoryStore::new();
        let mut broken = experience(3);
        broken.available_dates[0].time_slots[0].available_slots = 11;
        assert!(matches!(store.add_experience(broken), Err(StoreError::Corrupt(_))));
    }
}
