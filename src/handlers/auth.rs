//! Account endpoints. Login and registration rotate the session and adopt
//! the anonymous cart.

use axum::response::IntoResponse;
use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::auth::{self, CurrentUser, SessionContext};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    #[validate(length(min = 1))]
    name: String,
}

async fn register(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .register(&payload.email, &payload.password, &payload.name)
        .await
        .map_err(map_service_error)?;

    let session = auth::rotate_session(
        &*state.db,
        ctx.session_id,
        user.id,
        state.config.session_ttl_days,
    )
    .await
    .map_err(map_service_error)?;
    state
        .services
        .cart
        .merge_into_user(ctx.session_id, user.id)
        .await
        .map_err(map_service_error)?;

    let mut response = created_response(user);
    auth::set_session_cookie(&mut response, session.id, state.config.session_ttl_days);
    Ok(response)
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    // The pre-login anonymous cart follows the user into the account.
    state
        .services
        .cart
        .merge_into_user(ctx.session_id, user.id)
        .await
        .map_err(map_service_error)?;
    let session = auth::rotate_session(
        &*state.db,
        ctx.session_id,
        user.id,
        state.config.session_ttl_days,
    )
    .await
    .map_err(map_service_error)?;

    let mut response = success_response(user);
    auth::set_session_cookie(&mut response, session.id, state.config.session_ttl_days);
    Ok(response)
}

async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    auth::detach_user(&*state.db, ctx.session_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn me(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(user))
}
