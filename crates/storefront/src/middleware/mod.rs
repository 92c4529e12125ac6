//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID (record on span, echo on response)
//! 4. Security headers (CSP, frame and sniffing protection)
//! 5. Session layer (tower-sessions with `SQLite` store, signed cookie)
//! 6. Remember-me (re-applies the persistent expiry of remembered sessions)
//!
//! Extractors and helpers used by handlers:
//!
//! - [`RequireAuth`] / [`OptionalAuth`] - logged-in user from the session
//! - [`csrf`] - per-session form tokens
//! - [`session`] - login, logout, and flash messages

pub mod auth;
pub mod csrf;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth};
pub use csrf::{CsrfError, csrf_token, verify_csrf};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, remember_me_middleware};
