//! Integration tests for Cupboard.
//!
//! Each test builds the full storefront router on a private in-memory
//! database and upload directory, then drives it request by request with a
//! single-cookie client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cupboard-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::path::Path;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

use cupboard_storefront::config::StorefrontConfig;
use cupboard_storefront::db;
use cupboard_storefront::middleware::session::SESSION_COOKIE_NAME;
use cupboard_storefront::state::AppState;

const BOUNDARY: &str = "cupboard-test-boundary";

/// A fully-read HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The session `Set-Cookie` header, if the response set one.
    #[must_use]
    pub fn session_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE_NAME))
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// Value of the hidden form token in an HTML page.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let marker = r#"name="csrf_token" value=""#;
        let start = self.body.find(marker)? + marker.len();
        let len = self.body.get(start..)?.find('"')?;
        self.body.get(start..start + len).map(str::to_owned)
    }
}

/// A file part for a multipart request.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Running storefront plus a one-cookie browser.
pub struct TestContext {
    pub app: Router,
    pub pool: SqlitePool,
    pub upload_dir: TempDir,
    cookie: Option<String>,
}

impl TestContext {
    /// Build the app on a fresh migrated database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build the app, letting the caller adjust the configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut StorefrontConfig)) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::migrate(&pool).await.unwrap();

        let upload_dir = tempfile::tempdir().unwrap();
        let mut config =
            StorefrontConfig::for_local("sqlite::memory:", upload_dir.path().to_owned()).unwrap();
        adjust(&mut config);

        let app = cupboard_storefront::app(AppState::new(config, pool.clone()));

        Self {
            app,
            pool,
            upload_dir,
            cookie: None,
        }
    }

    /// Directory uploaded images land in.
    #[must_use]
    pub fn images_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Names of files currently in the upload directory.
    #[must_use]
    pub fn stored_images(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.images_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Forget the session cookie.
    pub fn clear_cookies(&mut self) {
        self.cookie = None;
    }

    /// Send a request, carrying and updating the session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let response = TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        };

        if let Some(set_cookie) = response.session_cookie() {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            if set_cookie.contains("Max-Age=0") {
                self.cookie = None;
            } else {
                self.cookie = Some(pair.to_owned());
            }
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST a urlencoded form.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// POST a multipart form with optional file part.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<FilePart<'_>>,
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    file.field, file.filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::post(uri)
                .header(header::CONTENT_LENGTH, body.len())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Fetch a page and return its form token.
    pub async fn csrf_token(&mut self, uri: &str) -> String {
        let page = self.get(uri).await;
        page.csrf_token()
            .unwrap_or_else(|| panic!("no form token on {uri}: {}", page.status))
    }

    /// Register an account through the form.
    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token("/register").await;
        self.post_form(
            "/register",
            &[
                ("csrf_token", &token),
                ("username", username),
                ("email", email),
                ("password", password),
                ("confirm_password", password),
            ],
        )
        .await
    }

    /// Log in through the form.
    pub async fn login(&mut self, username: &str, password: &str, remember: bool) -> TestResponse {
        let token = self.csrf_token("/login").await;
        let mut fields = vec![
            ("csrf_token", token.as_str()),
            ("username", username),
            ("password", password),
        ];
        if remember {
            fields.push(("remember", "on"));
        }
        self.post_form("/login", &fields).await
    }

    /// Register and log in a user in one step.
    pub async fn sign_in(&mut self, username: &str) {
        let email = format!("{username}@example.com");
        let registered = self.register(username, &email, "secret1").await;
        assert_eq!(registered.status, StatusCode::SEE_OTHER, "{}", registered.body);
        let logged_in = self.login(username, "secret1", false).await;
        assert_eq!(logged_in.status, StatusCode::SEE_OTHER, "{}", logged_in.body);
    }

    /// Submit the add-cup form as the current user.
    pub async fn add_cup(
        &mut self,
        fields: &[(&str, &str)],
        image: Option<FilePart<'_>>,
    ) -> TestResponse {
        let token = self.csrf_token("/add_cup").await;
        let mut all = vec![("csrf_token", token.as_str())];
        all.extend_from_slice(fields);
        self.post_multipart("/add_cup", &all, image).await
    }

    /// Number of cup rows.
    pub async fn cup_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM cup")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

/// Standard fields for a valid cup.
#[must_use]
pub fn cup_fields<'a>(title: &'a str, price: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("description", ""),
        ("price", price),
        ("category", "mug"),
        ("color", "red"),
    ]
}

/// A tiny PNG-named file part.
#[must_use]
pub const fn png(filename: &str) -> FilePart<'_> {
    FilePart {
        field: "image",
        filename,
        bytes: b"\x89PNG\r\n\x1a\n",
    }
}
