//! Admin user directory and role management.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::user::UserRole;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response, PaginatedResponse};
use crate::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/role", put(set_role))
}

#[derive(Debug, Deserialize)]
struct UserListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .users
        .list(query.page, query.limit, query.search.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
        total,
    )))
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: UserRole,
}

async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .users
        .set_role(admin.id, id, payload.role)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}
