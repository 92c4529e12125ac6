//! Item creation with image upload through the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use cupboard_integration_tests::{FilePart, TestContext, cup_fields, png};

#[tokio::test]
async fn test_add_cup_requires_login() {
    let mut ctx = TestContext::new().await;

    let page = ctx.get("/add_cup").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login?next=%2Fadd_cup"));

    let post = ctx
        .post_multipart("/add_cup", &cup_fields("Mug A", "9.99"), Some(png("a.png")))
        .await;
    assert_eq!(post.status, StatusCode::SEE_OTHER);
    assert_eq!(ctx.cup_count().await, 0);
    assert!(ctx.stored_images().is_empty());
}

#[tokio::test]
async fn test_add_cup_stores_record_and_image() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .add_cup(&cup_fields("Mug A", "9.99"), Some(png("mug a.png")))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    assert_eq!(response.location(), Some("/"));

    assert_eq!(ctx.cup_count().await, 1);
    assert_eq!(ctx.stored_images(), vec!["mug_a.png"]);

    let home = ctx.get("/").await;
    assert!(home.body.contains("Added"));
    assert!(home.body.contains("Mug A"));
    assert!(home.body.contains("/static/images/mug_a.png"));

    let image = ctx.get("/static/images/mug_a.png").await;
    assert_eq!(image.status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_price_writes_nothing() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .add_cup(&cup_fields("Mug A", "abc"), Some(png("a.png")))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("price must be a number"));
    // The form is redisplayed with what was typed
    assert!(response.body.contains(r#"value="Mug A""#));
    assert_eq!(ctx.cup_count().await, 0);
    assert!(ctx.stored_images().is_empty());
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .add_cup(&cup_fields("Mug A", "-1"), Some(png("a.png")))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("price cannot be negative"));
    assert_eq!(ctx.cup_count().await, 0);
}

#[tokio::test]
async fn test_missing_image_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx.add_cup(&cup_fields("Mug A", "9.99"), None).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("image is required"));
    assert_eq!(ctx.cup_count().await, 0);
}

#[tokio::test]
async fn test_unsupported_image_type_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .add_cup(
            &cup_fields("Mug A", "9.99"),
            Some(FilePart {
                field: "image",
                filename: "payload.html",
                bytes: b"<script></script>",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(ctx.stored_images().is_empty());
}

#[tokio::test]
async fn test_traversal_filename_stays_in_upload_dir() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .add_cup(&cup_fields("Mug A", "9.99"), Some(png("../../etc/evil.png")))
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    assert_eq!(ctx.stored_images(), vec!["evil.png"]);
    assert!(!ctx.images_dir().parent().unwrap().join("evil.png").exists());
}

#[tokio::test]
async fn test_name_collision_gets_unique_name() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    for title in ["Mug A", "Mug B"] {
        let response = ctx
            .add_cup(&cup_fields(title, "9.99"), Some(png("mug.png")))
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    assert_eq!(ctx.stored_images(), vec!["mug-1.png", "mug.png"]);

    let api = ctx.get("/api/cups").await.json();
    let images: Vec<&str> = api
        .as_array()
        .unwrap()
        .iter()
        .map(|cup| cup["image"].as_str().unwrap())
        .collect();
    assert!(images[0].ends_with("/static/images/mug.png"));
    assert!(images[1].ends_with("/static/images/mug-1.png"));
}

#[tokio::test]
async fn test_add_cup_without_form_token_is_rejected() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;

    let response = ctx
        .post_multipart("/add_cup", &cup_fields("Mug A", "9.99"), Some(png("a.png")))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.cup_count().await, 0);
    assert!(ctx.stored_images().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let mut ctx = TestContext::with_config(|config| config.max_upload_bytes = 1024).await;
    ctx.sign_in("curator").await;

    let big = vec![0_u8; 4096];
    let response = ctx
        .add_cup(
            &cup_fields("Mug A", "9.99"),
            Some(FilePart {
                field: "image",
                filename: "big.png",
                bytes: &big,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ctx.cup_count().await, 0);
    assert!(ctx.stored_images().is_empty());
}
