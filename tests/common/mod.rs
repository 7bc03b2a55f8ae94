use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::config::AppConfig;
use storefront_api::entities::user::UserRole;
use storefront_api::entities::{discount_code, product, user, User};
use storefront_api::events::{process_events, EventSender};
use storefront_api::{db, AppState};

/// Test harness: the full router over a fresh in-memory SQLite database.
/// The pool is pinned to one connection so the database lives as long as the
/// harness.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let events = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(process_events(event_rx));

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), events);
        let router = storefront_api::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Sends a request, returning status, headers, and the parsed JSON body
    /// (Null when the response has no body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }

    /// The `sid` cookie pair from the response, last one wins (login and
    /// register rotate the session after the middleware minted one).
    pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .filter(|pair| pair.trim_start().starts_with("sid="))
            .last()
            .map(|pair| pair.trim().to_string())
    }

    /// Starts an anonymous session by hitting the cart endpoint.
    pub async fn anonymous_session(&self) -> String {
        let (status, headers, _) = self.request(Method::GET, "/api/cart", None, None).await;
        assert_eq!(status, StatusCode::OK);
        Self::session_cookie(&headers).expect("no session cookie minted")
    }

    /// Registers a customer and returns (user_id, session cookie).
    pub async fn register_customer(&self, email: &str) -> (Uuid, String) {
        let (status, headers, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "s3cret-password",
                    "name": "Test Customer",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
        let cookie = Self::session_cookie(&headers).expect("no session cookie after register");
        (user_id, cookie)
    }

    /// Registers a user and promotes them to admin directly in the database.
    pub async fn register_admin(&self, email: &str) -> (Uuid, String) {
        let (user_id, cookie) = self.register_customer(email).await;
        let found = User::find_by_id(user_id)
            .one(&*self.state.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: user::ActiveModel = found.into();
        active.role = Set(UserRole::Admin);
        active.update(&*self.state.db).await.unwrap();
        (user_id, cookie)
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(None),
            name: Set(name.to_string()),
            slug: Set(format!("{}-{}", name.to_lowercase().replace(' ', "-"), Uuid::new_v4())),
            description: Set(Some(format!("{} description", name))),
            price: Set(price),
            stock_quantity: Set(stock),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_discount(
        &self,
        code: &str,
        percent: Option<Decimal>,
        amount: Option<Decimal>,
        minimum: Decimal,
        max_uses: Option<i32>,
    ) -> discount_code::Model {
        let now = Utc::now();
        discount_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_percent: Set(percent),
            discount_amount: Set(amount),
            minimum_order_amount: Set(minimum),
            valid_from: Set(None),
            valid_to: Set(None),
            max_uses: Set(max_uses),
            times_used: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed discount code")
    }

    /// Adds a product to the caller's cart through the API.
    pub async fn add_to_cart(&self, cookie: &str, product_id: Uuid, quantity: i32) {
        let (status, _, body) = self
            .request(
                Method::POST,
                "/api/cart/items",
                Some(cookie),
                Some(serde_json::json!({
                    "product_id": product_id,
                    "quantity": quantity,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add_to_cart failed: {}", body);
    }

    /// Places an order through the payment endpoint.
    pub async fn checkout(
        &self,
        cookie: &str,
        discount_code: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut payload = serde_json::json!({
            "shipping_address": "1 Test Lane, Testville",
            "billing_address": "1 Test Lane, Testville",
            "payment_method": "card",
        });
        if let Some(code) = discount_code {
            payload["discount_code"] = Value::String(code.to_string());
        }
        let (status, _, body) = self
            .request(Method::POST, "/api/payment/process", Some(cookie), Some(payload))
            .await;
        (status, body)
    }
}
