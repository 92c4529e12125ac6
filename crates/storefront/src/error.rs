//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server faults to Sentry
//! before responding to the client. HTML route handlers return
//! `Result<T, AppError>`; the JSON API has its own `ApiError`.
//!
//! Field-level validation failures are normally rendered back into the form
//! by the handler. When one does reach `AppError` it becomes a plain `422`.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::CsrfError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Multipart body could not be read (malformed or too large).
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Form token check failed.
    #[error("CSRF error: {0}")]
    Csrf(#[from] CsrfError),
}

impl AppError {
    /// Whether this error is a server fault (reported to Sentry).
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Session(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Catalog(CatalogError::Repository(_) | CatalogError::Upload(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Validation(_)) | Self::Catalog(CatalogError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Multipart(e) => e.status(),
            _ if self.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Csrf(e) = self {
            return e.into_response();
        }

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            _ if self.is_server_error() => "Internal server error".to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid username or password".to_string(),
            Self::Auth(AuthError::Validation(errors))
            | Self::Catalog(CatalogError::Validation(errors)) => errors.to_string(),
            Self::Multipart(e) => e.body_text(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
