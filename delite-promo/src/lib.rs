pub mod models;
pub mod ledger;

pub use models::{normalize_code, DiscountType, PromoCode, PromoRejection};
pub use ledger::{PromoError, PromoLedger};
