//! Cupboard storefront library.
//!
//! The catalog site, its JSON API, and authentication, exposed as a library
//! so the binary and the integration tests build the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::uploads::IMAGES_PATH;
use crate::state::AppState;

/// Build the full application router with every middleware layer applied.
pub fn app(state: AppState) -> Router {
    let config = state.config();

    let session_layer = middleware::create_session_layer(state.pool(), config)
        .with_signed(middleware::session::signing_key(config));

    let images = ServeDir::new(&config.upload_dir);
    let assets = ServeDir::new(&config.assets_dir);

    Router::new()
        .merge(routes::routes(&state))
        .nest_service(IMAGES_PATH, images)
        .nest_service("/assets", assets)
        .layer(from_fn(middleware::remember_me_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
