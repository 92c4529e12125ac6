//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog page with filters
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Database readiness check
//!
//! # Auth
//! GET  /register               - Registration page
//! POST /register               - Registration action
//! GET  /login                  - Login page (accepts ?next=)
//! POST /login                  - Login action
//! GET  /logout                 - Logout (requires auth)
//!
//! # Catalog (requires auth)
//! GET  /add_cup                - Item creation form
//! POST /add_cup                - Item creation (multipart)
//!
//! # JSON API (read-only)
//! GET  /api/cups               - Filtered list
//! GET  /api/cups/{id}          - Single item
//! ```

pub mod api;
pub mod auth;
pub mod cups;
pub mod home;

use std::convert::Infallible;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::csrf_token;
use crate::middleware::session::take_flashes;
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Values every HTML page needs: who is logged in, pending flashes, and the
/// form token.
pub struct PageContext {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
}

impl PageContext {
    /// Load the context for a page render, consuming pending flashes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn load(
        session: &Session,
        current_user: Option<CurrentUser>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            current_user,
            flashes: take_flashes(session).await?,
            csrf_token: csrf_token(session).await?,
        })
    }

    /// Username of the logged-in user, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.current_user.as_ref().map(|u| u.username.as_str())
    }
}

/// Create the page and API routes (without static files or middleware).
pub fn routes(state: &AppState) -> Router<AppState> {
    let max_upload = state.config().max_upload_bytes;

    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/add_cup",
            get(cups::add_cup_page)
                .post(cups::add_cup)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(max_upload)),
        )
        .nest("/api", api::routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::db::test_support;

    async fn router() -> Router {
        let pool = test_support::pool().await;
        let config =
            StorefrontConfig::for_local("sqlite::memory:", std::env::temp_dir()).unwrap();
        let state = AppState::new(config, pool);
        routes(&state).with_state(state)
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = router()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_checks_database() {
        let pool = test_support::pool().await;
        let config =
            StorefrontConfig::for_local("sqlite::memory:", std::env::temp_dir()).unwrap();
        let state = AppState::new(config, pool.clone());
        let app = routes(&state).with_state(state);

        let ready = app
            .clone()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);

        pool.close().await;
        let closed = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(closed.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
