use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::ServiceError;
use tracing::error;

/// Error answered to HTTP callers as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a service failure; `failed` is the caller-facing message for storage errors.
    pub fn from_service(err: ServiceError, failed: &str) -> Self {
        match err {
            ServiceError::Validation(reason) => Self::bad_request(reason.to_string()),
            ServiceError::BadRequest(msg) => Self::bad_request(msg),
            ServiceError::DuplicateId(id) => Self::bad_request(format!("a product with id {id} already exists")),
            ServiceError::NotFound(msg) => Self::not_found(msg),
            ServiceError::Persistence(detail) => {
                error!(error = %detail, "{failed}");
                Self::internal(failed)
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::from_service(err, "internal server error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({"error": self.message}))).into_response()
    }
}

/// Parse an `:id` path segment; only plain integers are accepted.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse::<i64>().map_err(|_| ApiError::bad_request("invalid id"))
}

/// Converts a handler panic into a generic 500 so the process keeps serving.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = %detail, "unhandled error while serving request");
    ApiError::internal("internal server error").into_response()
}
