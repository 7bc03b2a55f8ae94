//! Back-office reporting endpoints.

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response};
use crate::services::analytics::DateRange;
use crate::AppState;

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sales_summary))
        .route("/top-products", get(top_products))
        .route("/inventory", get(inventory_summary))
        .route("/customers", get(customer_summary))
        .route("/traffic", get(traffic_summary))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl RangeQuery {
    fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

async fn sales_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RangeQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .analytics
        .sales_summary(query.range())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

async fn top_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RangeQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ranked = state
        .services
        .analytics
        .top_products(query.range(), query.limit.unwrap_or(10))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ranked))
}

async fn inventory_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .analytics
        .inventory_summary()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

async fn customer_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RangeQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .analytics
        .customer_summary(query.range())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

async fn traffic_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RangeQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .analytics
        .traffic_summary(query.range())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}
