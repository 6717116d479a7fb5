use serde::{Deserialize, Serialize};

const BASIS_POINTS: i64 = 10_000;

/// Line items of a priced booking, all in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: i64,
    pub quantity: u32,
    pub subtotal: i64,
    pub taxes: i64,
    pub discount: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Fractional tax rate applied to the subtotal (0.05 = 5%)
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { tax_rate: 0.05 }
    }
}

/// Booking pricing engine
pub struct PricingEngine {
    tax_basis_points: i64,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        // Tax rates are configured as decimals but applied in basis points so
        // that rounding of the tax line is exact.
        let tax_basis_points = (config.tax_rate * BASIS_POINTS as f64).round() as i64;
        Self { tax_basis_points }
    }

    pub fn subtotal(&self, base_price: i64, quantity: u32) -> i64 {
        base_price.saturating_mul(i64::from(quantity))
    }

    /// Tax on a subtotal, rounded half away from zero.
    pub fn taxes(&self, subtotal: i64) -> i64 {
        let scaled = i128::from(subtotal) * i128::from(self.tax_basis_points);
        let half = i128::from(BASIS_POINTS / 2);
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(BASIS_POINTS)
        } else {
            (scaled - half) / i128::from(BASIS_POINTS)
        };
        rounded as i64
    }

    /// Price `quantity` seats at `base_price` and apply an already-computed discount.
    ///
    /// The total never goes below zero.
    pub fn calculate_total(&self, base_price: i64, quantity: u32, discount: i64) -> PriceBreakdown {
        let subtotal = self.subtotal(base_price, quantity);
        let taxes = self.taxes(subtotal);
        let total = (subtotal + taxes - discount).max(0);

        PriceBreakdown {
            base_price,
            quantity,
            subtotal,
            taxes,
            discount,
            total,
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
