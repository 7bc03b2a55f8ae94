//! Storefront API: catalog browsing with 3D product previews, carts and
//! checkout, and an admin back-office for inventory, orders, discounts, and
//! reporting.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{routing::get, Json, Router};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::addresses::AddressService;
use crate::services::analytics::AnalyticsService;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::discounts::DiscountService;
use crate::services::inventory::InventoryService;
use crate::services::orders::OrderService;
use crate::services::users::UserService;
use crate::services::wishlists::WishlistService;

/// All services, constructed once at startup and shared through [`AppState`].
pub struct AppServices {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub checkout: CheckoutService,
    pub inventory: InventoryService,
    pub orders: OrderService,
    pub discounts: DiscountService,
    pub analytics: AnalyticsService,
    pub users: UserService,
    pub wishlists: WishlistService,
    pub addresses: AddressService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, events: Arc<EventSender>) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            cart: CartService::new(db.clone(), events.clone()),
            checkout: CheckoutService::new(db.clone(), events.clone()),
            inventory: InventoryService::new(db.clone(), events.clone(), config.low_stock_threshold),
            orders: OrderService::new(db.clone(), events.clone()),
            discounts: DiscountService::new(db.clone()),
            analytics: AnalyticsService::new(db.clone(), config.low_stock_threshold),
            users: UserService::new(db.clone(), events.clone()),
            wishlists: WishlistService::new(db.clone()),
            addresses: AddressService::new(db),
        }
    }
}

/// Shared application state. Cheap to clone; everything inside is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: Arc<AppServices>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>, events: Arc<EventSender>) -> Self {
        let services = Arc::new(AppServices::new(db.clone(), &config, events));
        Self {
            db,
            config,
            services,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "E-commerce storefront backend with an admin back-office"
    ),
    components(schemas(
        errors::ErrorResponse,
        services::cart::CartLine,
        services::cart::CartView,
        services::checkout::DiscountOutcome,
        services::checkout::CheckoutResult,
        services::analytics::SalesSummary,
        services::analytics::TopProduct,
        services::analytics::InventorySummary,
        services::analytics::CustomerSummary,
        services::analytics::PathCount,
        services::analytics::TrafficSummary,
    ))
)]
struct ApiDoc;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn health_db(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, errors::ServiceError> {
    db::check_connection(&state.db).await?;
    Ok(Json(serde_json::json!({ "status": "ok", "database": "ok" })))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// The `/api` surface: public storefront routes plus the role-gated
/// `/api/admin` back-office. Session resolution wraps everything.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .merge(handlers::catalog::catalog_routes())
        .nest("/cart", handlers::carts::cart_routes())
        .nest("/payment", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/wishlist", handlers::wishlists::wishlist_routes())
        .nest("/addresses", handlers::addresses::address_routes())
        .nest("/admin", handlers::admin::admin_routes())
        .layer(axum::middleware::from_fn_with_state(
            state,
            auth::session_middleware,
        ))
}

fn cors_layer(config: &AppConfig) -> tower_http::cors::CorsLayer {
    use tower_http::cors::CorsLayer;
    match config.cors_allowed_origins.as_deref() {
        Some(origins) => {
            let allowed: Vec<axum::http::HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        None if config.is_development() => CorsLayer::permissive(),
        None => CorsLayer::new(),
    }
}

/// Builds the complete application router.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        .route("/api-docs/openapi.json", get(openapi_spec))
        .nest("/api", api_routes(state.clone()))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
