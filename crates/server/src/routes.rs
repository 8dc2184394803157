use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{get, put},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::errors::{handle_panic, ApiError};
use crate::state::AppState;

pub mod orders;
pub mod products;

/// Request bodies above this size are refused.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub async fn health() -> Json<Health> {
    Json(Health::now())
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

/// JSON API mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/produtos", get(products::list_products).post(products::create_product))
        .route(
            "/produtos/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/pedidos", get(orders::list_orders).post(orders::create_order))
        .route("/pedidos/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/pedidos/:id/status", put(orders::update_order_status))
        .route("/health", get(health))
        .fallback(not_found)
}

/// Build the full application router: API, static assets and the JSON 404 fallback.
pub fn build_router(state: AppState, static_dir: Option<&Path>, cors: CorsLayer) -> Router {
    let router = Router::new().nest("/api", api_router());

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).not_found_service(not_found.into_service())),
        None => router.fallback(not_found),
    };

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 5xx responses are logged as failures
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
