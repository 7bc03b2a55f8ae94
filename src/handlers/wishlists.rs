//! Wishlist endpoints, signed-in users only.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response};
use crate::AppState;

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wishlist))
        .route("/items/:product_id", post(add_item))
        .route("/items/:product_id", delete(remove_item))
}

async fn get_wishlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .wishlists
        .get(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .wishlists
        .add(user.id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .wishlists
        .remove(user.id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}
