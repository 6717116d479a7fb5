use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use delite_order::FieldError;
use delite_promo::{DiscountType, PromoCode, PromoRejection};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatePromoRequest {
    pub code: Option<String>,
    pub order_value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<AppliedPromo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoListing {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_value: i64,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
}

impl From<PromoCode> for PromoListing {
    fn from(promo: PromoCode) -> Self {
        Self {
            code: promo.code,
            description: promo.description,
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            min_order_value: promo.min_order_value,
            valid_until: promo.valid_until,
            usage_limit: promo.usage_limit,
            used_count: promo.used_count,
        }
    }
}

impl ValidatePromoResponse {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: None,
            message: Some(message.into()),
            promo_code: None,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/promo", get(list_promos))
        .route("/api/promo/validate", post(validate_promo))
}

async fn validate_promo(
    State(state): State<AppState>,
    payload: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> Result<Json<ValidatePromoResponse>, AppError> {
    let Json(req) = payload?;

    let code = req.code.as_deref().map(str::trim).unwrap_or_default();
    if code.is_empty() {
        return Ok(Json(ValidatePromoResponse::rejected("Promo code is required")));
    }

    let order_value = req.order_value.as_ref().and_then(parse_order_value).ok_or_else(|| {
        AppError::ValidationError(vec![FieldError {
            field: "orderValue".to_string(),
            message: "Order value must be a number".to_string(),
        }])
    })?;

    let promo = state
        .promos
        .find_by_code(code)
        .await
        .map_err(|e| AppError::internal("Error validating promo code", e))?;

    let Some(promo) = promo else {
        debug!("Promo lookup miss for {}", code);
        return Ok(Json(ValidatePromoResponse::rejected(PromoRejection::NotFound.to_string())));
    };

    let response = match promo.evaluate_amount(order_value, Utc::now()) {
        Ok(discount) => ValidatePromoResponse {
            valid: true,
            discount: Some(discount),
            message: None,
            promo_code: Some(AppliedPromo {
                code: promo.code,
                description: promo.description,
                discount_type: promo.discount_type,
                discount_value: promo.discount_value,
            }),
        },
        Err(rejection) => {
            debug!("Promo {} rejected: {}", promo.code, rejection);
            ValidatePromoResponse::rejected(rejection.to_string())
        }
    };

    Ok(Json(response))
}

async fn list_promos(State(state): State<AppState>) -> Result<Json<Vec<PromoListing>>, AppError> {
    let promos = state
        .promos
        .list_active()
        .await
        .map_err(|e| AppError::internal("Error fetching promo codes", e))?;

    Ok(Json(promos.into_iter().map(PromoListing::from).collect()))
}

/// Accepts a JSON number or a numeric string. The value is kept unrounded.
fn parse_order_value(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_order_value() {
        assert_eq!(parse_order_value(&json!(1998)), Some(1998.0));
        assert_eq!(parse_order_value(&json!("1998")), Some(1998.0));
        assert_eq!(parse_order_value(&json!(499.5)), Some(499.5));
        assert_eq!(parse_order_value(&json!("abc")), None);
        assert_eq!(parse_order_value(&json!(null)), None);
    }

    #[test]
    fn test_rejected_response_omits_discount() {
        let json = serde_json::to_value(ValidatePromoResponse::rejected("Invalid promo code")).unwrap();
        assert_eq!(json, json!({ "valid": false, "message": "Invalid promo code" }));
    }
}
