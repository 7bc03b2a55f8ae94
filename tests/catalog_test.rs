mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use storefront_api::entities::product_model;

async fn seed_model(
    app: &TestApp,
    product_id: Uuid,
    format: &str,
    resolution: &str,
) -> product_model::Model {
    use sea_orm::ActiveValue;
    use storefront_api::entities::product_model::{ModelFormat, ModelResolution};
    let format = match format {
        "glb" => ModelFormat::Glb,
        _ => ModelFormat::Usdz,
    };
    let resolution = match resolution {
        "low" => ModelResolution::Low,
        "medium" => ModelResolution::Medium,
        _ => ModelResolution::High,
    };
    product_model::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        url: Set(format!("https://cdn.example.com/{}.bin", Uuid::new_v4())),
        format: Set(format),
        resolution: Set(resolution),
        size_bytes: ActiveValue::Set(Some(1024)),
    }
    .insert(&*app.state.db)
    .await
    .unwrap()
}

#[tokio::test]
async fn product_listing_searches_and_sorts() {
    let app = TestApp::new().await;
    app.seed_product("Alpha Lamp", dec!(30.00), 5).await;
    app.seed_product("Beta Lamp", dec!(10.00), 5).await;
    app.seed_product("Gamma Chair", dec!(20.00), 5).await;

    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/products?search=Lamp&sort_by=price&sort_order=asc",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], json!("Beta Lamp"));
    assert_eq!(body["pagination"]["total"], json!(2));
}

#[tokio::test]
async fn unknown_sort_field_falls_back_instead_of_failing() {
    let app = TestApp::new().await;
    app.seed_product("Only One", dec!(1.00), 1).await;

    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/products?sort_by=definitely_not_a_column",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn product_detail_includes_images_models_and_counts_a_view() {
    let app = TestApp::new().await;
    let product = app.seed_product("Showpiece", dec!(99.00), 5).await;
    seed_model(&app, product.id, "glb", "high").await;

    let cookie = app.anonymous_session().await;
    let uri = format!("/api/products/{}", product.id);
    let (status, _, body) = app.request(Method::GET, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("Showpiece"));
    assert_eq!(body["models"].as_array().unwrap().len(), 1);

    // The view lands in the recently-viewed list for the same session.
    let (status, _, recent) = app
        .request(Method::GET, "/api/recently-viewed", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = recent.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(product.id.to_string()));
}

#[tokio::test]
async fn model_resolution_respects_the_quality_ceiling() {
    let app = TestApp::new().await;
    let product = app.seed_product("Rendered", dec!(50.00), 5).await;
    seed_model(&app, product.id, "glb", "low").await;
    let medium = seed_model(&app, product.id, "glb", "medium").await;
    seed_model(&app, product.id, "glb", "high").await;

    let uri = format!("/api/products/{}/model?quality=medium", product.id);
    let (status, _, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(medium.id.to_string()));
    assert_eq!(body["resolution"], json!("medium"));
}

#[tokio::test]
async fn model_resolution_prefers_the_requested_format() {
    let app = TestApp::new().await;
    let product = app.seed_product("Formatted", dec!(50.00), 5).await;
    seed_model(&app, product.id, "glb", "high").await;
    let usdz = seed_model(&app, product.id, "usdz", "medium").await;

    let uri = format!("/api/products/{}/model?format=usdz", product.id);
    let (_, _, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(body["id"], json!(usdz.id.to_string()));
}

#[tokio::test]
async fn product_without_models_is_a_404() {
    let app = TestApp::new().await;
    let product = app.seed_product("Flat Only", dec!(50.00), 5).await;

    let uri = format!("/api/products/{}/model", product.id);
    let (status, _, _) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_review_replaces_the_first() {
    let app = TestApp::new().await;
    let product = app.seed_product("Reviewed", dec!(10.00), 5).await;
    let (_, cookie) = app.register_customer("critic@example.com").await;

    let uri = format!("/api/products/{}/reviews", product.id);
    let (status, _, _) = app
        .request(
            Method::POST,
            &uri,
            Some(&cookie),
            Some(json!({ "rating": 2, "comment": "meh" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, _) = app
        .request(
            Method::POST,
            &uri,
            Some(&cookie),
            Some(json!({ "rating": 5, "comment": "grew on me" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, _, listing) = app.request(Method::GET, &uri, None, None).await;
    let rows = listing["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["rating"], json!(5));
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Picky", dec!(10.00), 5).await;
    let (_, cookie) = app.register_customer("critic@example.com").await;

    let uri = format!("/api/products/{}/reviews", product.id);
    let (status, _, _) = app
        .request(Method::POST, &uri, Some(&cookie), Some(json!({ "rating": 6 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wishlist_round_trip() {
    let app = TestApp::new().await;
    let product = app.seed_product("Wanted", dec!(10.00), 5).await;
    let (_, cookie) = app.register_customer("wisher@example.com").await;

    let uri = format!("/api/wishlist/items/{}", product.id);
    // Adding twice is idempotent.
    for _ in 0..2 {
        let (status, _, body) = app.request(Method::POST, &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }

    let (status, _, body) = app.request(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn default_address_swap_is_exclusive() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_customer("mover@example.com").await;

    let address = |line1: &str, is_default: bool| {
        json!({
            "recipient": "Pat Mover",
            "line1": line1,
            "city": "Springfield",
            "state": "OR",
            "postal_code": "97477",
            "country": "US",
            "is_default": is_default,
        })
    };

    let (status, _, first) = app
        .request(
            Method::POST,
            "/api/addresses",
            Some(&cookie),
            Some(address("1 First St", true)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/addresses",
            Some(&cookie),
            Some(address("2 Second St", true)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, _, listing) = app
        .request(Method::GET, "/api/addresses", Some(&cookie), None)
        .await;
    let rows = listing.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let defaults: Vec<_> = rows
        .iter()
        .filter(|a| a["is_default"] == json!(true))
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["line1"], json!("2 Second St"));
    assert_ne!(defaults[0]["id"], first["id"]);
}

#[tokio::test]
async fn rotation_leaves_a_single_live_session_cookie() {
    let app = TestApp::new().await;

    let sid_cookies = |headers: &axum::http::HeaderMap| -> Vec<String> {
        headers
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|raw| raw.trim_start().starts_with("sid="))
            .map(str::to_string)
            .collect()
    };

    let (status, headers, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "rotate@example.com",
                "password": "s3cret-password",
                "name": "Rotating User",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sid_cookies(&headers).len(), 1);

    let (status, headers, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "email": "rotate@example.com",
                "password": "s3cret-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sid_cookies(&headers).len(), 1);

    // The cookie a client keeps must belong to a live session.
    let cookie = TestApp::session_cookie(&headers).unwrap();
    let (status, _, body) = app
        .request(Method::GET, "/api/auth/me", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("rotate@example.com"));
}

#[tokio::test]
async fn me_reflects_the_session_and_never_leaks_the_hash() {
    let app = TestApp::new().await;

    let (status, _, _) = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, cookie) = app.register_customer("whoami@example.com").await;
    let (status, _, body) = app
        .request(Method::GET, "/api/auth/me", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("whoami@example.com"));
    assert!(body.get("password_hash").is_none());

    // Logout drops the user but keeps the session usable anonymously.
    let (status, _, _) = app
        .request(Method::POST, "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app
        .request(Method::GET, "/api/auth/me", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
