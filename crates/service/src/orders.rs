use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::errors::ServiceError;
use crate::model::{Order, OrderDraft, OrderStatus};
use crate::storage::DocumentStore;
use crate::validation::{validate_order, ValidationError};

/// Order collection of the shared document.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<DocumentStore>,
}

/// Next id derived from the live collection: `max + 1`, or 1 when empty.
pub fn next_order_id(orders: &[Order]) -> i64 {
    orders.iter().map(|o| o.id).max().map_or(1, |max| max + 1)
}

impl OrderService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// All orders, newest first. Storage order is left untouched.
    pub async fn list(&self) -> Vec<Order> {
        let mut orders = self.store.read().await.orders;
        orders.sort_by(|a, b| {
            b.created_at_iso
                .cmp(&a.created_at_iso)
                .then_with(|| b.id.cmp(&a.id))
        });
        orders
    }

    pub async fn get(&self, id: i64) -> Result<Order, ServiceError> {
        self.store
            .read()
            .await
            .orders
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ServiceError::not_found("order"))
    }

    /// Validate a submission, assign the next id and append it as `pending`.
    pub async fn create(&self, candidate: Value) -> Result<Order, ServiceError> {
        validate_order(&candidate)?;
        let draft = OrderDraft::from_candidate(&candidate).ok_or(ValidationError::InvalidOrder)?;

        let order = self
            .store
            .mutate(|doc| {
                let order = draft.into_order(next_order_id(&doc.orders), Utc::now());
                doc.orders.push(order.clone());
                Ok(order)
            })
            .await?;
        info!(order_id = order.id, items = order.items.len(), "order created");
        Ok(order)
    }

    /// Move an order to `status` and stamp `updatedAtIso`. Any listed status may follow any other.
    pub async fn update_status(&self, id: i64, status: &str) -> Result<Order, ServiceError> {
        let status: OrderStatus = status.parse().map_err(|_| ValidationError::InvalidStatus)?;

        self.store
            .mutate(|doc| {
                let order = doc
                    .orders
                    .iter_mut()
                    .find(|o| o.id == id)
                    .ok_or_else(|| ServiceError::not_found("order"))?;
                order.status = status;
                order.updated_at_iso = Some(Utc::now());
                Ok(order.clone())
            })
            .await
    }

    /// Remove an order and return it.
    pub async fn delete(&self, id: i64) -> Result<Order, ServiceError> {
        self.store
            .mutate(|doc| {
                let index = doc
                    .orders
                    .iter()
                    .position(|o| o.id == id)
                    .ok_or_else(|| ServiceError::not_found("order"))?;
                Ok(doc.orders.remove(index))
            })
            .await
    }
}
