use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// How a promo discount is computed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` percent of the order value
    Percentage,
    /// Flat `discount_value` off the order
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

/// A promotional code with a validity window and usage accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_order_value: i64,
    #[serde(default)]
    pub max_discount: Option<i64>,
    #[serde(default = "Utc::now")]
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub used_count: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Why a promo code cannot be applied to an order
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoRejection {
    #[error("Invalid promo code")]
    NotFound,

    #[error("Promo code has expired or is no longer valid")]
    NoLongerValid,

    #[error("Minimum order value of ₹{min} required")]
    BelowMinimum { min: i64 },
}

/// Canonical lookup form of a user-entered code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromoCode {
    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    /// Active, inside the validity window and under the usage limit.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now >= self.valid_from && now <= self.valid_until && self.has_uses_left()
    }

    /// Discount for `order_value`, or 0 when the code does not apply.
    pub fn calculate_discount(&self, order_value: i64, now: DateTime<Utc>) -> i64 {
        self.evaluate(order_value, now).unwrap_or(0)
    }

    /// Like `calculate_discount` but says why a code was refused.
    pub fn evaluate(&self, order_value: i64, now: DateTime<Utc>) -> Result<i64, PromoRejection> {
        self.evaluate_amount(order_value as f64, now)
    }

    /// Evaluates a possibly fractional order value. The minimum-order check
    /// and the percentage both use the unrounded amount; only the resulting
    /// discount is rounded to whole currency units.
    pub fn evaluate_amount(&self, order_value: f64, now: DateTime<Utc>) -> Result<i64, PromoRejection> {
        if !self.is_valid(now) {
            return Err(PromoRejection::NoLongerValid);
        }
        if order_value < self.min_order_value as f64 {
            return Err(PromoRejection::BelowMinimum { min: self.min_order_value });
        }

        let mut raw = match self.discount_type {
            DiscountType::Percentage => order_value * self.discount_value / 100.0,
            DiscountType::Fixed => self.discount_value,
        };
        if let Some(cap) = self.max_discount {
            raw = raw.min(cap as f64);
        }

        // f64::round rounds half away from zero
        Ok(raw.min(order_value).max(0.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn promo(discount_type: DiscountType, value: f64, min: i64, max: Option<i64>) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            description: "10% off".to_string(),
            discount_type,
            discount_value: value,
            min_order_value: min,
            max_discount: max,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            usage_limit: Some(100),
            used_count: 0,
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn test_percentage_discount_rounds_under_cap() {
        let save10 = promo(DiscountType::Percentage, 10.0, 500, Some(200));
        // 199.8 rounds to 200
        assert_eq!(save10.calculate_discount(1998, Utc::now()), 200);
    }

    #[test]
    fn test_percentage_discount_capped() {
        let save10 = promo(DiscountType::Percentage, 10.0, 500, Some(200));
        assert_eq!(save10.calculate_discount(5000, Utc::now()), 200);
    }

    #[test]
    fn test_fixed_discount_clamped_to_order() {
        let flat = promo(DiscountType::Fixed, 100.0, 0, None);
        assert_eq!(flat.calculate_discount(1500, Utc::now()), 100);
        assert_eq!(flat.calculate_discount(60, Utc::now()), 60);
    }

    #[test]
    fn test_below_minimum() {
        let save10 = promo(DiscountType::Percentage, 10.0, 500, Some(200));
        assert_eq!(save10.evaluate(400, Utc::now()), Err(PromoRejection::BelowMinimum { min: 500 }));
        assert_eq!(save10.calculate_discount(400, Utc::now()), 0);
        assert_eq!(
            PromoRejection::BelowMinimum { min: 500 }.to_string(),
            "Minimum order value of ₹500 required"
        );
    }

    #[test]
    fn test_fractional_order_value_is_not_rounded_before_minimum() {
        let save10 = promo(DiscountType::Percentage, 10.0, 500, Some(200));
        assert_eq!(
            save10.evaluate_amount(499.5, Utc::now()),
            Err(PromoRejection::BelowMinimum { min: 500 })
        );
        // 10% of 1004.6 is 100.46
        assert_eq!(save10.evaluate_amount(1004.6, Utc::now()), Ok(100));
        assert_eq!(save10.evaluate_amount(1005.0, Utc::now()), Ok(101));
    }

    #[test]
    fn test_validity_window_and_usage() {
        let now = Utc::now();
        let mut code = promo(DiscountType::Fixed, 100.0, 0, None);
        assert!(code.is_valid(now));

        code.used_count = 100;
        assert!(!code.is_valid(now));
        assert_eq!(code.evaluate(1000, now), Err(PromoRejection::NoLongerValid));

        code.used_count = 0;
        assert!(!code.is_valid(code.valid_until + Duration::seconds(1)));
        assert!(!code.is_valid(code.valid_from - Duration::seconds(1)));

        code.is_active = false;
        assert!(!code.is_valid(now));
    }

    #[test]
    fn test_unlimited_usage() {
        let mut code = promo(DiscountType::Fixed, 100.0, 0, None);
        code.usage_limit = None;
        code.used_count = 1_000_000;
        assert!(code.is_valid(Utc::now()));
    }

    #[test]
    fn test_deserialize_defaults() {
        let code: PromoCode = serde_json::from_value(serde_json::json!({
            "code": "FLAT100",
            "discountType": "fixed",
            "discountValue": 100,
            "validUntil": "2027-12-31T23:59:59Z"
        }))
        .unwrap();

        assert_eq!(code.min_order_value, 0);
        assert_eq!(code.used_count, 0);
        assert!(code.usage_limit.is_none());
        assert!(code.is_active);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert_eq!(DiscountType::parse("percentage"), Some(DiscountType::Percentage));
        assert_eq!(DiscountType::parse("bogus"), None);
    }

    proptest! {
        #[test]
        fn prop_discount_never_exceeds_order_or_cap(
            order in 0i64..1_000_000,
            pct in 0.0f64..100.0,
            fixed in 0.0f64..100_000.0,
            cap in proptest::option::of(0i64..5_000),
        ) {
            let now = Utc::now();
            for code in [
                promo(DiscountType::Percentage, pct, 0, cap),
                promo(DiscountType::Fixed, fixed, 0, cap),
            ] {
                let discount = code.calculate_discount(order, now);
                prop_assert!(discount >= 0);
                prop_assert!(discount <= order);
                if let Some(cap) = cap {
                    prop_assert!(discount <= cap);
                }
            }
        }
    }
}
