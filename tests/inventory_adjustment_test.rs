mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use storefront_api::entities::{inventory_log, InventoryLog, Product};

#[tokio::test]
async fn set_stock_updates_quantity_and_logs_delta() {
    let app = TestApp::new().await;
    let (admin_id, cookie) = app.register_admin("admin@example.com").await;
    let product = app.seed_product("Stocked Item", dec!(9.99), 10).await;

    let uri = format!("/api/admin/inventory/products/{}/stock", product.id);
    let (status, _, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&cookie),
            Some(json!({ "quantity": 25, "reason": "cycle count" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "set_stock failed: {}", body);
    assert_eq!(body["stock_quantity"], json!(25));

    let entry = InventoryLog::find()
        .filter(inventory_log::Column::ProductId.eq(product.id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("log entry missing");
    assert_eq!(entry.quantity_change, 15);
    assert_eq!(entry.reason, "cycle count");
    assert_eq!(entry.admin_id, Some(admin_id));
    assert_eq!(entry.reference_id, None);
}

#[tokio::test]
async fn stock_quantity_body_field_is_accepted() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_admin("admin@example.com").await;
    let product = app.seed_product("Renamed Field", dec!(9.99), 10).await;

    let uri = format!("/api/admin/inventory/products/{}/stock", product.id);
    let (status, _, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&cookie),
            Some(json!({ "stock_quantity": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "set_stock failed: {}", body);
    assert_eq!(body["stock_quantity"], json!(3));
}

#[tokio::test]
async fn setting_the_same_quantity_twice_logs_a_zero_delta() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_admin("admin@example.com").await;
    let product = app.seed_product("Unchanging", dec!(5.00), 7).await;

    let uri = format!("/api/admin/inventory/products/{}/stock", product.id);
    for _ in 0..2 {
        let (status, _, _) = app
            .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 7 })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let entries = InventoryLog::find()
        .filter(inventory_log::Column::ProductId.eq(product.id))
        .order_by_asc(inventory_log::Column::CreatedAt)
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.quantity_change == 0));
    assert!(entries.iter().all(|e| e.reason == "manual_adjustment"));

    let after = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock_quantity, 7);
}

#[tokio::test]
async fn negative_quantity_is_rejected() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_admin("admin@example.com").await;
    let product = app.seed_product("Nonnegative", dec!(5.00), 7).await;

    let uri = format!("/api/admin/inventory/products/{}/stock", product.id);
    let (status, _, _) = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": -1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let entries = InventoryLog::find().all(&*app.state.db).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn unknown_product_is_a_404() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_admin("admin@example.com").await;

    let uri = format!("/api/admin/inventory/products/{}/stock", Uuid::new_v4());
    let (status, _, _) = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 5 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customers_cannot_touch_inventory() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_customer("customer@example.com").await;
    let product = app.seed_product("Guarded", dec!(5.00), 7).await;

    let uri = format!("/api/admin/inventory/products/{}/stock", product.id);
    let (status, _, _) = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 0 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn low_stock_filter_narrows_the_inventory_listing() {
    let app = TestApp::new().await;
    let (_, cookie) = app.register_admin("admin@example.com").await;
    app.seed_product("Low", dec!(1.00), 2).await;
    app.seed_product("High", dec!(1.00), 50).await;

    let (status, _, body) = app
        .request(
            Method::GET,
            "/api/admin/inventory/products?low_stock_only=true",
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Low"));
}
