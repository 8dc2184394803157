//! Records held by the shared document.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// The persisted aggregate: both collections, in insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Catalog item. Fields other than `id`, `name` and `price` are kept as-is.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Overlay `patch` onto this product field by field.
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<Product, serde_json::Error> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(fields))
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Customer order. `id` and the timestamps are always assigned by the service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub items: Vec<Value>,
    pub total: Number,
    #[serde(default)]
    pub notes: String,
    pub created_date: String,
    pub created_time: String,
    pub created_at_iso: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_iso: Option<DateTime<Utc>>,
}

/// The caller-supplied part of an order, already trimmed.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub items: Vec<Value>,
    pub total: Number,
    pub notes: String,
}

impl OrderDraft {
    /// Extract the draft from a candidate that already passed `validate_order`.
    /// Returns `None` only when the required fields are absent.
    pub fn from_candidate(candidate: &Value) -> Option<Self> {
        let text = |key: &str| {
            candidate
                .get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let Some(Value::Number(total)) = candidate.get("total") else {
            return None;
        };
        Some(Self {
            customer_name: candidate.get("customerName")?.as_str()?.trim().to_string(),
            email: text("email"),
            phone: text("phone"),
            items: candidate.get("items")?.as_array()?.clone(),
            total: total.clone(),
            notes: text("notes"),
        })
    }

    pub fn into_order(self, id: i64, created_at: DateTime<Utc>) -> Order {
        let local = created_at.with_timezone(&Local);
        Order {
            id,
            customer_name: self.customer_name,
            email: self.email,
            phone: self.phone,
            items: self.items,
            total: self.total,
            notes: self.notes,
            created_date: local.format("%d/%m/%Y").to_string(),
            created_time: local.format("%H:%M:%S").to_string(),
            created_at_iso: created_at,
            status: OrderStatus::Pending,
            updated_at_iso: None,
        }
    }
}
