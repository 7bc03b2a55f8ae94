//! Admin inventory views and the absolute stock-set operation.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::services::inventory::InventoryFilter;
use crate::AppState;

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_inventory))
        .route("/products/:id/stock", put(set_stock))
        .route("/log", get(list_log))
}

#[derive(Debug, Deserialize)]
struct InventoryQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    #[serde(default)]
    low_stock_only: bool,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

async fn list_inventory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<InventoryQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let filter = InventoryFilter {
        page: query.page,
        limit: query.limit,
        search: query.search,
        low_stock_only: query.low_stock_only,
        sort_by: query.sort_by,
        sort_desc: matches!(
            query.sort_order.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("desc")
        ),
    };
    let (rows, total) = state
        .services
        .inventory
        .list_products(&filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
        total,
    )))
}

#[derive(Debug, Deserialize, Validate)]
struct SetStockRequest {
    #[serde(alias = "stock_quantity")]
    #[validate(range(min = 0))]
    quantity: i32,
    reason: Option<String>,
}

async fn set_stock(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .inventory
        .set_stock(id, payload.quantity, payload.reason, admin.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    product_id: Option<Uuid>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_log(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .inventory
        .list_log(query.product_id, query.page, query.limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
        total,
    )))
}
