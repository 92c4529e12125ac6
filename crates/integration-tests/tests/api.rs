//! Read-only JSON API.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use axum::http::StatusCode;
use serde_json::json;

use cupboard_integration_tests::{TestContext, png};

#[tokio::test]
async fn test_created_cup_is_served_by_the_api() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;
    ctx.add_cup(
        &[
            ("title", "Mug A"),
            ("description", "Stoneware"),
            ("price", "9.99"),
            ("category", "mug"),
            ("color", "red"),
        ],
        Some(png("a.png")),
    )
    .await;

    let list = ctx.get("/api/cups").await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(
        list.headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );

    let cups = list.json();
    assert_eq!(cups.as_array().unwrap().len(), 1);
    let id = cups[0]["id"].as_i64().unwrap();

    let one = ctx.get(&format!("/api/cups/{id}")).await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(
        one.json(),
        json!({
            "id": id,
            "title": "Mug A",
            "description": "Stoneware",
            "price": 9.99,
            "image": "http://127.0.0.1:3000/static/images/a.png",
            "category": "mug",
            "color": "red",
        })
    );
}

#[tokio::test]
async fn test_api_applies_filters() {
    let mut ctx = TestContext::new().await;
    ctx.sign_in("curator").await;
    for (title, price, color) in [("Cheap", "3", "red"), ("Dear", "30", "red"), ("Blue", "3", "blue")] {
        ctx.add_cup(
            &[
                ("title", title),
                ("description", ""),
                ("price", price),
                ("category", "mug"),
                ("color", color),
            ],
            Some(png("c.png")),
        )
        .await;
    }

    let cups = ctx.get("/api/cups?color=red&max_price=10").await.json();
    let cups = cups.as_array().unwrap();
    assert_eq!(cups.len(), 1);
    assert_eq!(cups[0]["title"], "Cheap");
    assert_eq!(cups[0]["price"].as_f64().unwrap(), 3.0);
}

#[tokio::test]
async fn test_api_empty_catalog_is_empty_array() {
    let mut ctx = TestContext::new().await;
    let list = ctx.get("/api/cups").await;

    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json(), json!([]));
}

#[tokio::test]
async fn test_api_unknown_cup_is_not_found() {
    let mut ctx = TestContext::new().await;

    let missing = ctx.get("/api/cups/999").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"], "cup 999 not found");

    let garbage = ctx.get("/api/cups/abc").await;
    assert_eq!(garbage.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_bad_price_filter_lists_field() {
    let mut ctx = TestContext::new().await;
    let response = ctx.get("/api/cups?min_price=lots").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(body["fields"]["min_price"].is_array());
}
