//! Security headers applied to every response.
//!
//! The catalog serves only its own stylesheet and uploaded images, and posts
//! forms back to itself, so the policy is locked to `'self'`.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

const CSP: &str = "default-src 'none'; \
                   style-src 'self'; \
                   img-src 'self'; \
                   form-action 'self'; \
                   base-uri 'self'; \
                   frame-ancestors 'none'; \
                   object-src 'none'";

/// Add security headers to all responses.
///
/// - `Content-Security-Policy` - same-origin styles, images, and form targets
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff` - uploaded files are never sniffed as HTML
/// - `Referrer-Policy: same-origin`
/// - `Permissions-Policy` - camera, microphone, geolocation, payment denied
/// - `Cross-Origin-Opener-Policy: same-origin`
/// - `Cache-Control: no-store` on dynamic responses that set no policy
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    // Static files carry their own Last-Modified/ETag validators
    let is_static = headers.contains_key(axum::http::header::LAST_MODIFIED);
    if !is_static && !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}
