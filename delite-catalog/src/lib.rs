pub mod experience;
pub mod pricing;
pub mod inventory;

pub use experience::{DateAvailability, Experience, ExperienceError, ExperienceQuery, ExperienceSummary, SlotKey, TimeSlot};
pub use pricing::{PriceBreakdown, PricingConfig, PricingEngine};
pub use inventory::{InventoryError, SlotInventory};
