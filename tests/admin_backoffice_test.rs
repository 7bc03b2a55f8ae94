mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use common::TestApp;

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => s.parse().unwrap(),
        serde_json::Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

#[tokio::test]
async fn discount_crud_round_trip() {
    let app = TestApp::new().await;
    let (_, admin) = app.register_admin("admin@example.com").await;

    let (status, _, created) = app
        .request(
            Method::POST,
            "/api/admin/discounts",
            Some(&admin),
            Some(json!({
                "code": "SPRING20",
                "discount_percent": "20",
                "minimum_order_amount": "25",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", created);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["times_used"], json!(0));

    // Duplicate codes are rejected.
    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/admin/discounts",
            Some(&admin),
            Some(json!({ "code": "SPRING20", "discount_percent": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Percent and amount cannot both be missing.
    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/admin/discounts",
            Some(&admin),
            Some(json!({ "code": "NOTHING" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/admin/discounts/{}", id);
    let (status, _, updated) = app
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "code": "SPRING25", "discount_percent": "25" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["code"], json!("SPRING25"));

    let (status, _, _) = app.request(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app.request(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_surface_is_gated() {
    let app = TestApp::new().await;

    // Anonymous session: 401.
    let cookie = app.anonymous_session().await;
    let (status, _, _) = app
        .request(Method::GET, "/api/admin/orders", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signed-in customer: 403.
    let (_, customer) = app.register_customer("plain@example.com").await;
    let (status, _, _) = app
        .request(Method::GET, "/api/admin/orders", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_changes_work_but_self_demotion_is_blocked() {
    let app = TestApp::new().await;
    let (admin_id, admin) = app.register_admin("admin@example.com").await;
    let (customer_id, _) = app.register_customer("promotee@example.com").await;

    let uri = format!("/api/admin/users/{}/role", customer_id);
    let (status, _, body) = app
        .request(Method::PUT, &uri, Some(&admin), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], json!("admin"));

    let uri = format!("/api/admin/users/{}/role", admin_id);
    let (status, _, _) = app
        .request(Method::PUT, &uri, Some(&admin), Some(json!({ "role": "customer" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sales_report_excludes_cancelled_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("Reportable", dec!(50.00), 20).await;

    let (_, alice) = app.register_customer("alice@example.com").await;
    app.add_to_cart(&alice, product.id, 1).await;
    let (_, first) = app.checkout(&alice, None).await;

    let (_, bob) = app.register_customer("bob@example.com").await;
    app.add_to_cart(&bob, product.id, 2).await;
    let (_, _second) = app.checkout(&bob, None).await;

    let (_, admin) = app.register_admin("admin@example.com").await;
    let cancel_uri = format!(
        "/api/admin/orders/{}/status",
        first["order_id"].as_str().unwrap()
    );
    let (status, _, _) = app
        .request(
            Method::PUT,
            &cancel_uri,
            Some(&admin),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, report) = app
        .request(Method::GET, "/api/admin/reports/sales", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "report failed: {}", report);
    assert_eq!(report["order_count"], json!(1));
    assert_eq!(decimal(&report["revenue"]), dec!(100.00));
    assert_eq!(report["orders_by_status"]["cancelled"], json!(1));
    assert_eq!(report["orders_by_status"]["pending"], json!(1));
}

#[tokio::test]
async fn top_products_ranks_by_units_sold() {
    let app = TestApp::new().await;
    let hot = app.seed_product("Hot Item", dec!(5.00), 50).await;
    let cold = app.seed_product("Cold Item", dec!(500.00), 50).await;

    let (_, buyer) = app.register_customer("fan@example.com").await;
    app.add_to_cart(&buyer, hot.id, 5).await;
    app.add_to_cart(&buyer, cold.id, 1).await;
    let (status, _) = app.checkout(&buyer, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, admin) = app.register_admin("admin@example.com").await;
    let (status, _, ranked) = app
        .request(
            Method::GET,
            "/api/admin/reports/top-products",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = ranked.as_array().unwrap();
    assert_eq!(rows[0]["product_id"], json!(hot.id.to_string()));
    assert_eq!(rows[0]["units_sold"], json!(5));
}

#[tokio::test]
async fn inventory_report_counts_stock_buckets() {
    let app = TestApp::new().await;
    app.seed_product("Gone", dec!(1.00), 0).await;
    app.seed_product("Low", dec!(1.00), 2).await;
    app.seed_product("Fine", dec!(1.00), 40).await;

    let (_, admin) = app.register_admin("admin@example.com").await;
    let (status, _, report) = app
        .request(
            Method::GET,
            "/api/admin/reports/inventory",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["product_count"], json!(3));
    assert_eq!(report["out_of_stock_count"], json!(1));
    assert_eq!(report["low_stock_count"], json!(1));
    assert_eq!(report["units_on_hand"], json!(42));
}

#[tokio::test]
async fn traffic_report_counts_views_and_sessions() {
    let app = TestApp::new().await;
    let product = app.seed_product("Popular", dec!(1.00), 5).await;
    let uri = format!("/api/products/{}", product.id);

    let first = app.anonymous_session().await;
    let second = app.anonymous_session().await;
    app.request(Method::GET, &uri, Some(&first), None).await;
    app.request(Method::GET, &uri, Some(&first), None).await;
    app.request(Method::GET, &uri, Some(&second), None).await;

    let (_, admin) = app.register_admin("admin@example.com").await;
    let (status, _, report) = app
        .request(
            Method::GET,
            "/api/admin/reports/traffic",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["page_views"], json!(3));
    assert_eq!(report["unique_sessions"], json!(2));
    assert_eq!(report["top_paths"][0]["path"], json!(uri));
    assert_eq!(report["top_paths"][0]["count"], json!(3));
}
