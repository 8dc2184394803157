use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use service::model::Product;

use crate::errors::{parse_id, ApiError};
use crate::state::AppState;

/// List all products in creation order
pub async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.products.list().await)
}

/// Fetch one product
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id)?;
    let product = state.products.get(id).await?;
    Ok(Json(product))
}

/// Create a product with a caller-chosen id
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(candidate) = payload?;
    let product = state
        .products
        .create(candidate)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to save product"))?;
    Ok((StatusCode::CREATED, Json(json!({"success": true, "product": product}))))
}

/// Merge the body over an existing product
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;
    let product = state
        .products
        .update(id, patch)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to update product"))?;
    Ok(Json(json!({"success": true, "product": product})))
}

/// Remove a product, answering with the removed record
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let product = state
        .products
        .delete(id)
        .await
        .map_err(|e| ApiError::from_service(e, "failed to remove product"))?;
    Ok(Json(json!({
        "success": true,
        "message": "product removed successfully",
        "product": product,
    })))
}
