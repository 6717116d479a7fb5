use serde::{Deserialize, Serialize};
use uuid::Uuid;
use delite_shared::Masked;
use delite_promo::normalize_code;

/// Raw booking request as it arrives over the wire.
///
/// Every field is optional so that missing values surface as field errors
/// instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    pub experience_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<Masked<String>>,
    pub selected_date: Option<String>,
    pub selected_time: Option<String>,
    pub quantity: Option<serde_json::Value>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// A booking request that passed input validation, in normalized form
#[derive(Debug, Clone)]
pub struct ValidatedBooking {
    pub experience_id: Uuid,
    pub customer_name: String,
    pub customer_email: Masked<String>,
    pub selected_date: String,
    pub selected_time: String,
    pub quantity: u32,
    pub promo_code: Option<String>,
}

impl BookingRequest {
    /// Check every field and collect all failures.
    pub fn validate(&self) -> Result<ValidatedBooking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let experience_id = self
            .experience_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok());
        if experience_id.is_none() {
            errors.push(FieldError::new("experienceId", "Valid experience ID required"));
        }

        let customer_name = self.customer_name.as_deref().unwrap_or_default().trim().to_string();
        if customer_name.chars().count() < 2 {
            errors.push(FieldError::new("customerName", "Name must be at least 2 characters"));
        }

        let customer_email = self
            .customer_email
            .as_ref()
            .map(|email| email.expose().trim().to_lowercase())
            .unwrap_or_default();
        if !is_valid_email(&customer_email) {
            errors.push(FieldError::new("customerEmail", "Valid email required"));
        }

        let selected_date = self.selected_date.as_deref().unwrap_or_default().trim().to_string();
        if selected_date.is_empty() {
            errors.push(FieldError::new("selectedDate", "Date is required"));
        }

        let selected_time = self.selected_time.as_deref().unwrap_or_default().trim().to_string();
        if selected_time.is_empty() {
            errors.push(FieldError::new("selectedTime", "Time is required"));
        }

        let quantity = self.quantity.as_ref().and_then(parse_quantity);
        if quantity.is_none() {
            errors.push(FieldError::new("quantity", "Quantity must be at least 1"));
        }

        let promo_code = self
            .promo_code
            .as_deref()
            .map(normalize_code)
            .filter(|code| !code.is_empty());

        match (experience_id, quantity) {
            (Some(experience_id), Some(quantity)) if errors.is_empty() => Ok(ValidatedBooking {
                experience_id,
                customer_name,
                customer_email: Masked(customer_email),
                selected_date,
                selected_time,
                quantity,
                promo_code,
            }),
            _ => Err(errors),
        }
    }
}

/// Accepts a positive integer given either as a JSON number or a numeric string
fn parse_quantity(value: &serde_json::Value) -> Option<u32> {
    let quantity = match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }?;
    (quantity >= 1).then_some(quantity)
}

/// Basic e-mail address syntax check
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    // Must contain exactly one @
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return false;
    }

    let valid_local_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local_chars) && domain.chars().all(valid_domain_chars)
}
