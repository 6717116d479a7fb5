use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use crate::experience::{Experience, SlotKey};

/// Capacity counter for one (experience, date, time) slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCounter {
    pub available_slots: i32,
    pub max_slots: i32,
}

/// In-memory slot inventory.
///
/// Each slot owns its own mutex so a check-and-subtract on one slot never
/// blocks bookings for another. The outer map lock is only held long enough
/// to find (or register) the counter.
pub struct SlotInventory {
    slots: RwLock<HashMap<SlotKey, Arc<Mutex<SlotCounter>>>>,
}

impl SlotInventory {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or reset) a slot counter
    pub fn register(&self, key: SlotKey, available_slots: i32, max_slots: i32) -> Result<(), InventoryError> {
        if max_slots < 1 || available_slots < 0 || available_slots > max_slots {
            return Err(InventoryError::InvalidCounter {
                slot: key.to_string(),
                available: available_slots,
                max: max_slots,
            });
        }

        let mut slots = self.slots.write().map_err(|_| InventoryError::LockPoisoned)?;
        slots.insert(key, Arc::new(Mutex::new(SlotCounter { available_slots, max_slots })));
        Ok(())
    }

    /// Register every slot an experience offers
    pub fn register_experience(&self, experience: &Experience) -> Result<(), InventoryError> {
        for (key, slot) in experience.slot_entries() {
            self.register(key, slot.available_slots, slot.max_slots)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &SlotKey) -> Result<Option<SlotCounter>, InventoryError> {
        let Some(counter) = self.counter(key)? else {
            return Ok(None);
        };
        let guard = counter.lock().map_err(|_| InventoryError::LockPoisoned)?;
        Ok(Some(*guard))
    }

    /// Subtract `quantity` if and only if enough capacity remains.
    ///
    /// Returns `Ok(false)` when the slot is unknown or too full; the counter
    /// is untouched in that case.
    pub fn try_decrement(&self, key: &SlotKey, quantity: u32) -> Result<bool, InventoryError> {
        let Ok(quantity) = i32::try_from(quantity) else {
            return Ok(false);
        };
        if quantity == 0 {
            return Ok(false);
        }

        let Some(counter) = self.counter(key)? else {
            return Ok(false);
        };

        let mut guard = counter.lock().map_err(|_| InventoryError::LockPoisoned)?;
        if guard.available_slots < quantity {
            return Ok(false);
        }
        guard.available_slots -= quantity;
        Ok(true)
    }

    /// Give capacity back (compensation for an aborted booking)
    pub fn restore(&self, key: &SlotKey, quantity: u32) -> Result<(), InventoryError> {
        let counter = self
            .counter(key)?
            .ok_or_else(|| InventoryError::NotFound(key.to_string()))?;

        let mut guard = counter.lock().map_err(|_| InventoryError::LockPoisoned)?;
        let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
        guard.available_slots = guard.available_slots.saturating_add(quantity).min(guard.max_slots);
        Ok(())
    }

    fn counter(&self, key: &SlotKey) -> Result<Option<Arc<Mutex<SlotCounter>>>, InventoryError> {
        let slots = self.slots.read().map_err(|_| InventoryError::LockPoisoned)?;
        Ok(slots.get(key).cloned())
    }
}

impl Default for SlotInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Inventory not found: {0}")]
    NotFound(String),

    #[error("Invalid counter for {slot}: available {available}, max {max}")]
    InvalidCounter {
        slot: String,
        available: i32,
        max: i32,
    },

    #[error("Inventory lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use std::thread;

    fn key() -> SlotKey {
        SlotKey::new(Uuid::new_v4(), "2026-11-02", "07:00 am")
    }

    #[test]
    fn test_inventory_lifecycle() {
        let inventory = SlotInventory::new();
        let slot = key();
        inventory.register(slot.clone(), 3, 8).unwrap();

        assert!(inventory.try_decrement(&slot, 2).unwrap());
        assert_eq!(inventory.get(&slot).unwrap().unwrap().available_slots, 1);

        // Not enough left: counter unchanged
        assert!(!inventory.try_decrement(&slot, 2).unwrap());
        assert_eq!(inventory.get(&slot).unwrap().unwrap().available_slots, 1);

        inventory.restore(&slot, 2).unwrap();
        assert_eq!(inventory.get(&slot).unwrap().unwrap().available_slots, 3);
    }

    #[test]
    fn test_restore_is_capped_at_max() {
        let inventory = SlotInventory::new();
        let slot = key();
        inventory.register(slot.clone(), 7, 8).unwrap();
        inventory.restore(&slot, 5).unwrap();
        assert_eq!(inventory.get(&slot).unwrap().unwrap().available_slots, 8);
    }

    #[test]
    fn test_unknown_slot_is_not_applied() {
        let inventory = SlotInventory::new();
        assert!(!inventory.try_decrement(&key(), 1).unwrap());
        assert!(matches!(inventory.restore(&key(), 1), Err(InventoryError::NotFound(_))));
    }

    #[test]
    fn test_register_rejects_bad_counter() {
        let inventory = SlotInventory::new();
        assert!(inventory.register(key(), 9, 8).is_err());
        assert!(inventory.register(key(), 0, 0).is_err());
        assert!(inventory.register(key(), -1, 8).is_err());
    }

    #[test]
    fn test_concurrent_decrements_never_oversell() {
        let inventory = Arc::new(SlotInventory::new());
        let slot = key();
        inventory.register(slot.clone(), 5, 8).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let inventory = inventory.clone();
                let slot = slot.clone();
                thread::spawn(move || inventory.try_decrement(&slot, 1).unwrap())
            })
            .collect();

        let applied = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(applied, 5);
        assert_eq!(inventory.get(&slot).unwrap().unwrap().available_slots, 0);
    }
}
