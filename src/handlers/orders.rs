//! A signed-in customer's own orders.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response, PaginatedResponse, PaginationParams};
use crate::AppState;

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own_orders))
        .route("/:id", get(get_own_order))
}

async fn list_own_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .orders
        .list_for_user(user.id, Some(pagination.page), Some(pagination.limit))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        pagination.page,
        pagination.limit,
        total,
    )))
}

async fn get_own_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .orders
        .get(id, Some(user.id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}
