//! Admin discount-code CRUD. `times_used` is read-only through this surface.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, PaginatedResponse,
};
use crate::services::discounts::DiscountInput;
use crate::AppState;

pub fn discount_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_discounts).post(create_discount))
        .route(
            "/:id",
            get(get_discount).put(update_discount).delete(delete_discount),
        )
}

#[derive(Debug, Deserialize)]
struct DiscountRequest {
    code: String,
    discount_percent: Option<Decimal>,
    discount_amount: Option<Decimal>,
    minimum_order_amount: Option<Decimal>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    max_uses: Option<i32>,
}

impl From<DiscountRequest> for DiscountInput {
    fn from(req: DiscountRequest) -> Self {
        DiscountInput {
            code: req.code,
            discount_percent: req.discount_percent,
            discount_amount: req.discount_amount,
            minimum_order_amount: req.minimum_order_amount,
            valid_from: req.valid_from,
            valid_to: req.valid_to,
            max_uses: req.max_uses,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscountListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    #[serde(default)]
    active_only: bool,
}

async fn list_discounts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<DiscountListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .discounts
        .list(query.page, query.limit, query.active_only)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
        total,
    )))
}

async fn create_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<DiscountRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let created = state
        .services
        .discounts
        .create(payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

async fn get_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let found = state
        .services
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(found))
}

async fn update_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DiscountRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .discounts
        .update(id, payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

async fn delete_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .discounts
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
