mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

use common::TestApp;
use storefront_api::entities::Product;

async fn place_orders(app: &TestApp, count: usize) {
    let product = app.seed_product("Bulk Item", dec!(10.00), 100).await;
    for i in 0..count {
        let (_, cookie) = app
            .register_customer(&format!("buyer{}@example.com", i))
            .await;
        app.add_to_cart(&cookie, product.id, 1).await;
        let (status, body) = app.checkout(&cookie, None).await;
        assert_eq!(status, StatusCode::CREATED, "checkout failed: {}", body);
    }
}

#[tokio::test]
async fn listing_paginates_with_correct_metadata() {
    let app = TestApp::new().await;
    place_orders(&app, 3).await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (status, _, body) = app
        .request(Method::GET, "/api/admin/orders?limit=2", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], json!(3));
    assert_eq!(body["pagination"]["total_pages"], json!(2));

    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/admin/orders?limit=2&page=2",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn listing_accepts_camel_case_date_and_sort_parameters() {
    let app = TestApp::new().await;
    place_orders(&app, 2).await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/admin/orders?startDate=2000-01-01T00:00:00Z&sort=total_amount&direction=desc",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);

    // An endDate before any order excludes everything.
    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/admin/orders?endDate=2000-01-01T00:00:00Z",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["orders"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], json!(0));
}

#[tokio::test]
async fn out_of_range_page_returns_empty_data_with_valid_metadata() {
    let app = TestApp::new().await;
    place_orders(&app, 1).await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (status, _, body) = app
        .request(Method::GET, "/api/admin/orders?page=99", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["orders"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], json!(1));
    assert_eq!(body["pagination"]["total_pages"], json!(1));
    assert_eq!(body["pagination"]["page"], json!(99));
}

#[tokio::test]
async fn empty_listing_still_reports_one_page() {
    let app = TestApp::new().await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (status, _, body) = app
        .request(Method::GET, "/api/admin/orders", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["orders"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], json!(0));
    assert_eq!(body["pagination"]["total_pages"], json!(1));
}

#[tokio::test]
async fn status_filter_and_transitions() {
    let app = TestApp::new().await;
    place_orders(&app, 1).await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (_, _, listing) = app
        .request(
            Method::GET,
            "/api/admin/orders?status=pending",
            Some(&admin),
            None,
        )
        .await;
    let order_id = listing["orders"][0]["id"].as_str().unwrap().to_string();

    // pending -> processing is allowed.
    let uri = format!("/api/admin/orders/{}/status", order_id);
    let (status, _, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "status": "processing" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "transition failed: {}", body);
    assert_eq!(body["status"], json!("processing"));

    // processing -> delivered skips shipped and is rejected.
    let (status, _, _) = app
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelling_an_order_does_not_restock() {
    let app = TestApp::new().await;
    let product = app.seed_product("No Refill", dec!(10.00), 5).await;
    let (_, cookie) = app.register_customer("cancel@example.com").await;
    app.add_to_cart(&cookie, product.id, 2).await;
    let (status, body) = app.checkout(&cookie, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (_, admin) = app.register_admin("admin@example.com").await;
    let uri = format!("/api/admin/orders/{}/status", order_id);
    let (status, _, _) = app
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let after = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock_quantity, 3);
}

#[tokio::test]
async fn customers_see_only_their_own_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("Private", dec!(10.00), 10).await;

    let (_, alice) = app.register_customer("alice@example.com").await;
    app.add_to_cart(&alice, product.id, 1).await;
    let (_, body) = app.checkout(&alice, None).await;
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (_, mallory) = app.register_customer("mallory@example.com").await;
    let uri = format!("/api/orders/{}", order_id);
    let (status, _, _) = app.request(Method::GET, &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.request(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}
