//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::RejectionReason;
use lifecycle::LifecycleError;
use reservation_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Lifecycle operation error.
    Lifecycle(LifecycleError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Lifecycle(err) => lifecycle_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn lifecycle_error_to_response(err: LifecycleError) -> (StatusCode, String) {
    match &err {
        LifecycleError::Rejected(reason) => match reason {
            // Booking clashes are conflicts; everything else is a bad request.
            RejectionReason::TableConflict { .. } | RejectionReason::UserConflict { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
            _ => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        LifecycleError::Transition(_) => (StatusCode::CONFLICT, err.to_string()),
        LifecycleError::Store(store_err) => store_error_to_response(store_err, &err),
        LifecycleError::NoTableAssigned(_) => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn store_error_to_response(store_err: &StoreError, err: &LifecycleError) -> (StatusCode, String) {
    match store_err {
        StoreError::VersionConflict { .. }
        | StoreError::TableConflict { .. }
        | StoreError::UserConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        StoreError::ReservationNotFound(_)
        | StoreError::NotificationNotFound(_)
        | StoreError::RestaurantNotFound(_)
        | StoreError::TableNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Database(_) | StoreError::Migration(_) | StoreError::Serialization(_) => {
            tracing::error!(error = %err, "storage error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Lifecycle(LifecycleError::Store(err))
    }
}
