//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers, and
//! the return-to (`next`) handling used around the login page.

use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::session::push_flash;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Anonymous HTML requests are redirected to `/login?next=<path>` with the
/// configured login flash queued. Requests under `/api/` get `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// The session store failed.
    Session,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Session => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to read session");
                AuthRejection::Session
            })?;

        if let Some(user) = user {
            return Ok(Self(user));
        }

        // Nested routers see a stripped path
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |original| original.0.clone());

        if uri.path().starts_with("/api/") {
            return Err(AuthRejection::Unauthorized);
        }

        let app = AppState::from_ref(state);
        let config = app.config();
        push_flash(
            &session,
            Flash::new(config.login_message_level, config.login_message.clone()),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to queue login flash");
            AuthRejection::Session
        })?;

        let original = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), ToString::to_string);

        Err(AuthRejection::RedirectToLogin(login_url(Some(&original))))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(user): OptionalAuth,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.username),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Login page URL, carrying `next` when it is a safe local target.
#[must_use]
pub fn login_url(next: Option<&str>) -> String {
    match next.filter(|n| is_safe_next(n)) {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_owned(),
    }
}

/// Whether `next` is a same-origin path that can be redirected to.
///
/// Accepts only paths starting with a single `/`. Protocol-relative
/// (`//host`), backslash (`/\host`), absolute URLs, and anything with control
/// characters are refused.
#[must_use]
pub fn is_safe_next(next: &str) -> bool {
    let mut chars = next.chars();
    if chars.next() != Some('/') {
        return false;
    }
    if matches!(chars.next(), Some('/' | '\\')) {
        return false;
    }
    !next.chars().any(char::is_control)
}

/// Redirect target after login: `next` if safe, otherwise `/`.
#[must_use]
pub fn resolve_next(next: Option<&str>) -> &str {
    next.filter(|n| is_safe_next(n)).unwrap_or("/")
}
