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
async fn anonymous_visitors_get_a_cart_on_first_touch() {
    let app = TestApp::new().await;
    let cookie = app.anonymous_session().await;

    let product = app.seed_product("Drop In", dec!(3.50), 10).await;
    app.add_to_cart(&cookie, product.id, 2).await;

    let (status, _, cart) = app.request(Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(2));
    assert_eq!(decimal(&cart["subtotal"]), dec!(7.00));
}

#[tokio::test]
async fn adding_the_same_product_increments_the_line() {
    let app = TestApp::new().await;
    let cookie = app.anonymous_session().await;
    let product = app.seed_product("Stacking", dec!(2.00), 10).await;

    app.add_to_cart(&cookie, product.id, 1).await;
    app.add_to_cart(&cookie, product.id, 3).await;

    let (_, _, cart) = app.request(Method::GET, "/api/cart", Some(&cookie), None).await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(4));
}

#[tokio::test]
async fn quantity_zero_removes_the_line() {
    let app = TestApp::new().await;
    let cookie = app.anonymous_session().await;
    let product = app.seed_product("Removable", dec!(2.00), 10).await;
    app.add_to_cart(&cookie, product.id, 2).await;

    let (_, _, cart) = app.request(Method::GET, "/api/cart", Some(&cookie), None).await;
    let item_id = cart["items"][0]["item_id"].as_str().unwrap().to_string();

    let uri = format!("/api/cart/items/{}", item_id);
    let (status, _, cart) = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn inactive_products_cannot_be_added() {
    let app = TestApp::new().await;
    let cookie = app.anonymous_session().await;
    let product = app.seed_product("Retired", dec!(2.00), 10).await;

    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use storefront_api::entities::{product as product_entity, Product};
    let found = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: product_entity::ActiveModel = found.into();
    active.is_active = Set(false);
    active.update(&*app.state.db).await.unwrap();

    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": product.id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_cart_follows_the_user_through_registration() {
    let app = TestApp::new().await;
    let cookie = app.anonymous_session().await;
    let product = app.seed_product("Keeper", dec!(12.00), 10).await;
    app.add_to_cart(&cookie, product.id, 1).await;

    // Register within the same session; the response rotates the cookie.
    let (status, headers, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(&cookie),
            Some(json!({
                "email": "migrant@example.com",
                "password": "s3cret-password",
                "name": "Migrant",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_cookie = TestApp::session_cookie(&headers).unwrap();
    assert_ne!(new_cookie, cookie);

    let (_, _, cart) = app
        .request(Method::GET, "/api/cart", Some(&new_cookie), None)
        .await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(1));
}

#[tokio::test]
async fn login_merges_overlapping_carts_by_summing_quantities() {
    let app = TestApp::new().await;
    let product = app.seed_product("Shared Like", dec!(5.00), 20).await;

    // Signed-in user leaves one unit in their cart, then "walks away".
    let (_, user_cookie) = app.register_customer("merger@example.com").await;
    app.add_to_cart(&user_cookie, product.id, 1).await;

    // A fresh anonymous session adds two more, then logs in.
    let anon = app.anonymous_session().await;
    app.add_to_cart(&anon, product.id, 2).await;
    let (status, headers, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(&anon),
            Some(json!({
                "email": "merger@example.com",
                "password": "s3cret-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let merged_cookie = TestApp::session_cookie(&headers).unwrap();

    let (_, _, cart) = app
        .request(Method::GET, "/api/cart", Some(&merged_cookie), None)
        .await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(3));
}
