//! Per-session CSRF tokens for HTML forms.
//!
//! Every rendered form embeds the session's token in a hidden `csrf_token`
//! field; POST handlers call [`verify_csrf`] before acting on the body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tower_sessions::Session;

use crate::models::session_keys;

const TOKEN_BYTES: usize = 32;

/// CSRF check failures.
#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("missing or invalid CSRF token")]
    Invalid,

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        match self {
            Self::Invalid => {
                tracing::warn!("rejected form post with bad CSRF token");
                (StatusCode::BAD_REQUEST, "Invalid or missing form token").into_response()
            }
            Self::Session(e) => {
                tracing::error!(error = %e, "session error during CSRF check");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// The session's CSRF token, creating one on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn csrf_token(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(token);
    }

    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    session.insert(session_keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

/// Check a submitted token against the session's.
///
/// # Errors
///
/// Returns `CsrfError::Invalid` if the token is missing or does not match.
pub async fn verify_csrf(session: &Session, submitted: Option<&str>) -> Result<(), CsrfError> {
    let expected = session.get::<String>(session_keys::CSRF_TOKEN).await?;

    match (expected, submitted) {
        (Some(expected), Some(submitted)) if constant_time_eq(&expected, submitted) => Ok(()),
        _ => Err(CsrfError::Invalid),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
