//! Registration, login, and logout through the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use cupboard_integration_tests::TestContext;

async fn user_count(ctx: &TestContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user")
        .fetch_one(&ctx.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_then_login() {
    let mut ctx = TestContext::new().await;

    let registered = ctx.register("alice", "alice@example.com", "secret1").await;
    assert_eq!(registered.status, StatusCode::SEE_OTHER);
    assert_eq!(registered.location(), Some("/login"));

    let logged_in = ctx.login("alice", "secret1", false).await;
    assert_eq!(logged_in.status, StatusCode::SEE_OTHER);
    assert_eq!(logged_in.location(), Some("/"));

    let home = ctx.get("/").await;
    assert!(home.body.contains("alice"));
    assert!(home.body.contains("/logout"));
}

#[tokio::test]
async fn test_register_reports_every_invalid_field() {
    let mut ctx = TestContext::new().await;
    let token = ctx.csrf_token("/register").await;

    let response = ctx
        .post_form(
            "/register",
            &[
                ("csrf_token", &token),
                ("username", "al"),
                ("email", "not-an-email"),
                ("password", "123"),
                ("confirm_password", "456"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("at least 4"));
    assert!(response.body.contains("@ symbol"));
    assert!(response.body.contains("passwords do not match"));
    assert_eq!(user_count(&ctx).await, 0);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;

    let again = ctx.register("alice", "other@example.com", "secret1").await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(again.body.contains("that username is taken"));
    assert_eq!(user_count(&ctx).await, 1);

    // Retrying with a fresh name succeeds
    let retry = ctx.register("alice2", "other@example.com", "secret1").await;
    assert_eq!(retry.status, StatusCode::SEE_OTHER);
    assert_eq!(user_count(&ctx).await, 2);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;

    let wrong_password = ctx.login("alice", "wrong-password", false).await;
    let unknown_user = ctx.login("nobody", "wrong-password", false).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.body.contains("Invalid username or password"));

    let strip = |body: &str| {
        let marker = r#"name="csrf_token" value=""#;
        let start = body.find(marker).unwrap() + marker.len();
        let end = start + body[start..].find('"').unwrap();
        format!("{}{}", &body[..start], &body[end..])
    };
    assert_eq!(strip(&wrong_password.body), strip(&unknown_user.body));
}

#[tokio::test]
async fn test_session_cookie_lifetime_follows_remember_me() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;

    let short = ctx.login("alice", "secret1", false).await;
    let cookie = short.session_cookie().unwrap();
    assert!(!cookie.contains("Max-Age"), "{cookie}");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    ctx.clear_cookies();
    let long = ctx.login("alice", "secret1", true).await;
    let cookie = long.session_cookie().unwrap();
    assert!(cookie.contains("Max-Age="), "{cookie}");
}

#[tokio::test]
async fn test_remembered_session_stays_persistent_across_pages() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;
    ctx.login("alice", "secret1", true).await;

    for uri in ["/", "/add_cup", "/"] {
        let page = ctx.get(uri).await;
        assert_eq!(page.status, StatusCode::OK, "{uri}");
        if let Some(cookie) = page.session_cookie() {
            assert!(cookie.contains("Max-Age="), "{uri}: {cookie}");
        }
    }

    let home = ctx.get("/").await;
    let cookie = home.session_cookie().unwrap();
    assert!(cookie.contains("Max-Age="), "{cookie}");
    assert!(home.body.contains("Signed in as alice"));
}

#[tokio::test]
async fn test_browser_session_stays_non_persistent_across_pages() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;
    ctx.login("alice", "secret1", false).await;

    for uri in ["/", "/add_cup"] {
        let page = ctx.get(uri).await;
        if let Some(cookie) = page.session_cookie() {
            assert!(!cookie.contains("Max-Age"), "{uri}: {cookie}");
        }
    }
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("alice").await;

    let logout = ctx.get("/logout").await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert_eq!(logout.location(), Some("/"));

    let home = ctx.get("/").await;
    assert!(home.body.contains("You have been logged out."));
    assert!(!home.body.contains("/logout"));

    let protected = ctx.get("/add_cup").await;
    assert_eq!(protected.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_without_form_token_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;

    let response = ctx
        .post_form("/login", &[("username", "alice"), ("password", "secret1")])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let forged = ctx
        .post_form(
            "/login",
            &[
                ("csrf_token", "forged"),
                ("username", "alice"),
                ("password", "secret1"),
            ],
        )
        .await;
    assert_eq!(forged.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_redirects_back_to_next() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;

    let bounce = ctx.get("/add_cup").await;
    assert_eq!(bounce.status, StatusCode::SEE_OTHER);
    assert_eq!(bounce.location(), Some("/login?next=%2Fadd_cup"));

    let login_page = ctx.get("/login?next=%2Fadd_cup").await;
    assert!(login_page.body.contains("Please log in to access this page."));
    let token = login_page.csrf_token().unwrap();

    let logged_in = ctx
        .post_form(
            "/login",
            &[
                ("csrf_token", &token),
                ("username", "alice"),
                ("password", "secret1"),
                ("next", "/add_cup"),
            ],
        )
        .await;
    assert_eq!(logged_in.location(), Some("/add_cup"));
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let mut ctx = TestContext::new().await;
    ctx.register("alice", "alice@example.com", "secret1").await;
    let token = ctx.csrf_token("/login").await;

    let response = ctx
        .post_form(
            "/login",
            &[
                ("csrf_token", &token),
                ("username", "alice"),
                ("password", "secret1"),
                ("next", "//evil.example/phish"),
            ],
        )
        .await;
    assert_eq!(response.location(), Some("/"));
}
