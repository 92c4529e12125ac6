//! Session middleware configuration and session helpers.
//!
//! Sessions are stored server-side in `SQLite` and referenced by a signed
//! cookie. A session lasts until the browser closes unless the user asked to
//! be remembered, in which case it expires after a window of inactivity.

use axum::{extract::Request, middleware::Next, response::Response};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;
use crate::models::{CurrentUser, Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cupboard_session";

/// Create the session layer with the `SQLite` store.
///
/// The returned layer still needs [`signing_key`] applied via
/// `SessionManagerLayer::with_signed`.
#[must_use]
pub fn create_session_layer(
    pool: &SqlitePool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SqliteStore> {
    // The tower_sessions table is created by `db::migrate`
    let store = SqliteStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Derive the 64-byte cookie signing key from the configured secret.
#[must_use]
pub fn signing_key(config: &StorefrontConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Establish an authenticated session.
///
/// The session ID is cycled so a pre-login ID cannot be reused. With
/// `remember_days` set the session survives browser restarts and expires after
/// that many days of inactivity.
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn log_in(
    session: &Session,
    user: &CurrentUser,
    remember_days: Option<i64>,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;

    match remember_days {
        Some(days) => {
            session.insert(session_keys::REMEMBER_DAYS, days).await?;
            session.set_expiry(Some(Expiry::OnInactivity(Duration::days(days))));
        }
        None => {
            session.remove::<i64>(session_keys::REMEMBER_DAYS).await?;
            session.set_expiry(Some(Expiry::OnSessionEnd));
        }
    }

    Ok(())
}

/// End the session. Safe to call when nobody is logged in.
///
/// Whatever is stored in the session afterwards lives only until the browser
/// closes.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted from the store.
pub async fn log_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    session.set_expiry(Some(Expiry::OnSessionEnd));
    Ok(())
}

/// Keep "remember me" sessions persistent.
///
/// Each request starts from the layer's browser-session expiry, so a
/// remembered session gets its inactivity window re-applied here. Must run
/// inside the session layer.
pub async fn remember_me_middleware(session: Session, request: Request, next: Next) -> Response {
    match session.get::<i64>(session_keys::REMEMBER_DAYS).await {
        Ok(Some(days)) => {
            session.set_expiry(Some(Expiry::OnInactivity(Duration::days(days))));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "failed to read remember-me window"),
    }

    next.run(request).await
}

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flash(
    session: &Session,
    flash: Flash,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await?
        .unwrap_or_default();
    flashes.push(flash);
    session.insert(session_keys::FLASHES, flashes).await
}

/// Remove and return every pending flash message.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn take_flashes(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::FlashLevel;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once() {
        let session = session();
        push_flash(&session, Flash::new(FlashLevel::Info, "one"))
            .await
            .unwrap();
        push_flash(&session, Flash::new(FlashLevel::Success, "two"))
            .await
            .unwrap();

        let flashes = take_flashes(&session).await.unwrap();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[1].message, "two");
        assert!(take_flashes(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_in_sets_expiry() {
        let user = CurrentUser {
            id: cupboard_core::UserId::new(1),
            username: "alice".to_owned(),
        };

        let browser = session();
        log_in(&browser, &user, None).await.unwrap();
        assert_eq!(browser.expiry(), Some(Expiry::OnSessionEnd));

        let remembered = session();
        log_in(&remembered, &user, Some(365)).await.unwrap();
        assert_eq!(
            remembered.expiry(),
            Some(Expiry::OnInactivity(Duration::days(365)))
        );
        let stored: CurrentUser = remembered
            .get(session_keys::CURRENT_USER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, user);

        let days: Option<i64> = remembered.get(session_keys::REMEMBER_DAYS).await.unwrap();
        assert_eq!(days, Some(365));

        log_out(&remembered).await.unwrap();
        let gone: Option<CurrentUser> = remembered.get(session_keys::CURRENT_USER).await.unwrap();
        assert!(gone.is_none());
        let days: Option<i64> = remembered.get(session_keys::REMEMBER_DAYS).await.unwrap();
        assert!(days.is_none());
        assert_eq!(remembered.expiry(), Some(Expiry::OnSessionEnd));
    }

    #[tokio::test]
    async fn test_log_in_without_remember_clears_window() {
        let user = CurrentUser {
            id: cupboard_core::UserId::new(1),
            username: "alice".to_owned(),
        };
        let session = session();

        log_in(&session, &user, Some(30)).await.unwrap();
        log_in(&session, &user, None).await.unwrap();

        let days: Option<i64> = session.get(session_keys::REMEMBER_DAYS).await.unwrap();
        assert!(days.is_none());
        assert_eq!(session.expiry(), Some(Expiry::OnSessionEnd));
    }
}
