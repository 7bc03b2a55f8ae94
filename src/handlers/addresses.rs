//! Shipping address book endpoints, signed-in users only.

use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::addresses::AddressInput;
use crate::AppState;

pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id", put(update_address))
        .route("/:id", delete(delete_address))
}

#[derive(Debug, Deserialize, Validate)]
struct AddressRequest {
    #[validate(length(min = 1))]
    recipient: String,
    #[validate(length(min = 1))]
    line1: String,
    line2: Option<String>,
    #[validate(length(min = 1))]
    city: String,
    state: String,
    #[validate(length(min = 1))]
    postal_code: String,
    #[validate(length(equal = 2))]
    country: String,
    #[serde(default)]
    is_default: bool,
}

impl From<AddressRequest> for AddressInput {
    fn from(req: AddressRequest) -> Self {
        AddressInput {
            recipient: req.recipient,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            is_default: req.is_default,
        }
    }
}

async fn list_addresses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let addresses = state
        .services
        .addresses
        .list(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(addresses))
}

async fn create_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AddressRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .addresses
        .create(user.id, payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

async fn update_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .addresses
        .update(user.id, id, payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

async fn delete_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .addresses
        .delete(user.id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
