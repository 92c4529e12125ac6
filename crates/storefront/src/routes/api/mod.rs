//! Read-only JSON API.
//!
//! Errors are JSON objects with an `error` message, plus `fields` for
//! invalid query parameters.

pub mod cups;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use cupboard_core::ValidationErrors;

use crate::db::RepositoryError;
use crate::state::AppState;

/// Create the API routes router (mounted under `/api`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cups", get(cups::list))
        .route("/cups/{id}", get(cups::show))
}

/// JSON API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid query parameters")]
    Validation(ValidationErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a ValidationErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match &self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "invalid query parameters".to_owned(),
                Some(errors),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone(), None),
            Self::Database(_) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(error = %self, sentry_event_id = %event_id, "API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: &message,
            fields,
        };
        (status, Json(body)).into_response()
    }
}
