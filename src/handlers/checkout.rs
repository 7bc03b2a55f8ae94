//! Payment processing. Payment capture itself is simulated; the endpoint's
//! contract is the transactional order placement behind it.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, map_service_error, validate_input};
use crate::services::checkout::{DiscountOutcome, PlaceOrderInput};
use crate::AppState;

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/process", post(process_payment))
}

#[derive(Debug, Deserialize, Validate)]
struct ProcessPaymentRequest {
    #[validate(length(min = 1))]
    shipping_address: String,
    #[validate(length(min = 1))]
    billing_address: String,
    #[validate(length(min = 1))]
    payment_method: String,
    discount_code: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
struct ProcessPaymentResponse {
    success: bool,
    order_id: Uuid,
    total_amount: rust_decimal::Decimal,
    discount_amount: rust_decimal::Decimal,
    discount_outcome: Option<DiscountOutcome>,
}

async fn process_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ProcessPaymentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let result = state
        .services
        .checkout
        .place_order(PlaceOrderInput {
            user_id: user.id,
            shipping_address: payload.shipping_address,
            billing_address: payload.billing_address,
            payment_method: payload.payment_method,
            discount_code: payload.discount_code,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProcessPaymentResponse {
        success: true,
        order_id: result.order_id,
        total_amount: result.total_amount,
        discount_amount: result.discount_amount,
        discount_outcome: result.discount_outcome,
    }))
}
