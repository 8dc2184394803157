use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use service::model::Order;

use crate::errors::{parse_id, ApiError};
use crate::state::AppState;

/// List orders, newest first
pub async fn list_orders(State(state): State<AppState>) -> Json<Vec<Order>> {
    Json(state.orders.list().await)
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&id)?;
    let order = state.orders.get(id).await?;
    Ok(Json(order))
}

/// Submit a new order; the id is assigned by the store
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(candidate) = payload?;
    let order = state
        .orders
        .create(candidate)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to save order"))?;
    Ok((StatusCode::CREATED, Json(json!({"success": true, "order": order}))))
}

/// Change only the status of an order. Body: `{"status": "..."}`
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
    let order = state
        .orders
        .update_status(id, status)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to update order"))?;
    Ok(Json(json!({"success": true, "order": order})))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let order = state
        .orders
        .delete(id)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to remove order"))?;
    Ok(Json(json!({
        "success": true,
        "message": "order removed successfully",
        "order": order,
    })))
}
