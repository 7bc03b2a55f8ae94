//! Cart endpoints. The cart follows the session for anonymous visitors and
//! the account once signed in.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::SessionContext;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::services::Owner;
use crate::AppState;

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item))
        .route("/items/:item_id", delete(remove_item))
        .route("/clear", post(clear_cart))
}

fn owner(ctx: &SessionContext) -> Owner {
    Owner::from_identity(ctx.user_id, ctx.session_id)
}

async fn get_cart(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .get(owner(&ctx))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    product_id: Uuid,
    #[validate(range(min = 1))]
    quantity: i32,
}

async fn add_item(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .cart
        .add_item(owner(&ctx), payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateItemRequest {
    #[validate(range(min = 0))]
    quantity: i32,
}

async fn update_item(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .cart
        .update_item(owner(&ctx), item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .remove_item(owner(&ctx), item_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

async fn clear_cart(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .clear(owner(&ctx))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}
