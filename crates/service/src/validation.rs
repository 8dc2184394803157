//! Shape checks for candidate records.
//!
//! Both validators are pure: they inspect a JSON candidate and report the first
//! failing rule. Nothing here touches the store.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid product")]
    InvalidProduct,
    #[error("invalid product id")]
    InvalidProductId,
    #[error("invalid product name")]
    InvalidProductName,
    #[error("invalid product price")]
    InvalidProductPrice,
    #[error("invalid order")]
    InvalidOrder,
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("order must have at least one item")]
    EmptyItems,
    #[error("invalid order total")]
    InvalidTotal,
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid status")]
    InvalidStatus,
}

fn non_blank_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// Checks, in order: object, `id`, `name`, `price`.
pub fn validate_product(candidate: &Value) -> Result<(), ValidationError> {
    let Some(fields) = candidate.as_object() else {
        return Err(ValidationError::InvalidProduct);
    };

    // ids are compared as integers everywhere else, so fractional ids are refused here
    if fields.get("id").and_then(Value::as_i64).is_none() {
        return Err(ValidationError::InvalidProductId);
    }

    if !non_blank_str(fields.get("name")) {
        return Err(ValidationError::InvalidProductName);
    }

    match fields.get("price").and_then(Value::as_f64) {
        Some(price) if price >= 0.0 => Ok(()),
        _ => Err(ValidationError::InvalidProductPrice),
    }
}

/// Checks, in order: object, `customerName`, `items`, `total`, `email`.
pub fn validate_order(candidate: &Value) -> Result<(), ValidationError> {
    let Some(fields) = candidate.as_object() else {
        return Err(ValidationError::InvalidOrder);
    };

    if !non_blank_str(fields.get("customerName")) {
        return Err(ValidationError::MissingCustomerName);
    }

    match fields.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {}
        _ => return Err(ValidationError::EmptyItems),
    }

    match fields.get("total").and_then(Value::as_f64) {
        Some(total) if total > 0.0 => {}
        _ => return Err(ValidationError::InvalidTotal),
    }

    match fields.get("email") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(email)) if email.trim().is_empty() || EMAIL_PATTERN.is_match(email) => Ok(()),
        Some(_) => Err(ValidationError::InvalidEmail),
    }
}
