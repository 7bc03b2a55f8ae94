//! Admin order listing and the status workflow.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::order::{self, OrderStatus};
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response, PaginationMeta};
use crate::services::orders::OrderFilter;
use crate::AppState;

pub fn admin_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
struct OrderQuery {
    page: Option<u64>,
    limit: Option<u64>,
    status: Option<OrderStatus>,
    #[serde(alias = "startDate")]
    start_date: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    end_date: Option<DateTime<Utc>>,
    search: Option<String>,
    #[serde(alias = "sort")]
    sort_by: Option<String>,
    #[serde(alias = "direction")]
    sort_order: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<OrderQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let filter = OrderFilter {
        page: query.page,
        limit: query.limit,
        status: query.status,
        start_date: query.start_date,
        end_date: query.end_date,
        search: query.search,
        sort_by: query.sort_by,
        sort_desc: matches!(
            query.sort_order.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("desc")
        ),
    };
    let (rows, total) = state
        .services
        .orders
        .list(&filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(OrderListResponse {
        orders: rows,
        pagination: PaginationMeta::new(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
            total,
        ),
    }))
}

#[derive(Debug, serde::Serialize)]
struct OrderListResponse {
    orders: Vec<order::Model>,
    pagination: PaginationMeta,
}

async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .orders
        .get(id, None)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}
