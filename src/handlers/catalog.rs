//! Public catalog endpoints: products, categories, 3D assets, reviews, and
//! the visitor's recently-viewed list.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{CurrentUser, SessionContext};
use crate::entities::product_model::{ModelFormat, ModelResolution};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::services::catalog::ProductFilter;
use crate::services::Owner;
use crate::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/model", get(get_product_model))
        .route(
            "/products/:id/reviews",
            get(list_reviews).post(add_review),
        )
        .route("/categories", get(list_categories))
        .route("/recently-viewed", get(recently_viewed))
}

#[derive(Debug, Deserialize)]
struct ListProductsQuery {
    page: Option<u64>,
    limit: Option<u64>,
    category_id: Option<Uuid>,
    search: Option<String>,
    sort_by: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
}

fn sort_desc(sort_order: Option<&str>) -> bool {
    matches!(sort_order.map(str::to_ascii_lowercase).as_deref(), Some("desc"))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let filter = ProductFilter {
        page: query.page,
        limit: query.limit,
        category_id: query.category_id,
        search: query.search,
        sort_by: query.sort_by,
        sort_desc: sort_desc(query.sort_order.as_deref()),
        include_inactive: false,
    };
    let (rows, total) = state
        .services
        .catalog
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

/// Product detail; also counts the view for analytics and the visitor's
/// recently-viewed list.
async fn get_product(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .catalog
        .get_product(id, false)
        .await
        .map_err(map_service_error)?;

    let owner = Owner::from_identity(ctx.user_id, ctx.session_id);
    let path = format!("/api/products/{}", id);
    if let Err(e) = state.services.catalog.record_view(owner, id, &path).await {
        // View tracking must never fail the product read.
        tracing::warn!("Failed to record product view: {}", e);
    }

    Ok(success_response(detail))
}

#[derive(Debug, Deserialize)]
struct ModelQuery {
    quality: Option<ModelResolution>,
    format: Option<ModelFormat>,
}

async fn get_product_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ModelQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let model = state
        .services
        .catalog
        .resolve_model(id, query.quality, query.format)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(model))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

#[derive(Debug, Deserialize)]
struct ReviewsQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReviewsQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .catalog
        .list_reviews(id, query.page, query.limit)
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
struct AddReviewRequest {
    #[validate(range(min = 1, max = 5))]
    rating: i16,
    comment: Option<String>,
}

async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddReviewRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let review = state
        .services
        .catalog
        .add_review(id, user.id, payload.rating, payload.comment)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(review))
}

#[derive(Debug, Deserialize)]
struct RecentlyViewedQuery {
    limit: Option<u64>,
}

async fn recently_viewed(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(query): Query<RecentlyViewedQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let owner = Owner::from_identity(ctx.user_id, ctx.session_id);
    let products = state
        .services
        .catalog
        .recently_viewed(owner, query.limit.unwrap_or(10))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}
