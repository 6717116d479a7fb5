use crate::models::{normalize_code, PromoCode};
use std::collections::HashMap;
use std::sync::Mutex;
use chrono::{DateTime, Utc};

/// In-memory promo code table with conditional usage accounting
pub struct PromoLedger {
    codes: Mutex<HashMap<String, PromoCode>>,
}

impl PromoLedger {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Add or replace a promo code; the code is stored normalized.
    pub fn insert(&self, mut promo: PromoCode) -> Result<(), PromoError> {
        promo.code = normalize_code(&promo.code);

        if promo.code.is_empty() {
            return Err(PromoError::Invalid("code is required".to_string()));
        }
        if promo.discount_value < 0.0 {
            return Err(PromoError::Invalid(format!("{}: negative discount value", promo.code)));
        }
        if let Some(limit) = promo.usage_limit {
            if promo.used_count > limit {
                return Err(PromoError::Invalid(format!(
                    "{}: usedCount {} exceeds usageLimit {}",
                    promo.code, promo.used_count, limit
                )));
            }
        }

        let mut codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        codes.insert(promo.code.clone(), promo);
        Ok(())
    }

    /// Case-insensitive lookup
    pub fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, PromoError> {
        let codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        Ok(codes.get(&normalize_code(code)).cloned())
    }

    /// Increment `used_count` unless the usage limit has been reached.
    ///
    /// Returns `Ok(false)` when the code is unknown or exhausted.
    pub fn try_record_usage(&self, code: &str) -> Result<bool, PromoError> {
        let mut codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        let Some(promo) = codes.get_mut(&normalize_code(code)) else {
            return Ok(false);
        };

        if !promo.has_uses_left() {
            tracing::debug!("Promo {} reached its usage limit", promo.code);
            return Ok(false);
        }
        promo.used_count += 1;
        Ok(true)
    }

    /// Undo one recorded use (compensation for an aborted booking)
    pub fn release_usage(&self, code: &str) -> Result<(), PromoError> {
        let mut codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        let normalized = normalize_code(code);
        let promo = codes
            .get_mut(&normalized)
            .ok_or(PromoError::NotFound(normalized))?;
        promo.used_count = (promo.used_count - 1).max(0);
        Ok(())
    }

    /// Active codes, newest first
    pub fn list_active(&self) -> Result<Vec<PromoCode>, PromoError> {
        let codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        let mut active: Vec<PromoCode> = codes.values().filter(|p| p.is_active).cloned().collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    /// Codes usable right now
    pub fn valid_count(&self, now: DateTime<Utc>) -> Result<usize, PromoError> {
        let codes = self.codes.lock().map_err(|_| PromoError::LockPoisoned)?;
        Ok(codes.values().filter(|p| p.is_valid(now)).count())
    }
}

impl Default for PromoLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PromoError {
    #[error("Promo code not found: {0}")]
    NotFound(String),

    #[error("Invalid promo code definition: {0}")]
    Invalid(String),

    #[error("Promo ledger lock poisoned")]
    LockPoisoned,
}
