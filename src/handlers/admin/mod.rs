//! Back-office endpoints. Every handler takes the [`AdminUser`] extractor,
//! so a non-admin session gets a 401/403 before any work happens.
//!
//! [`AdminUser`]: crate::auth::AdminUser

pub mod discounts;
pub mod inventory;
pub mod orders;
pub mod reports;
pub mod users;

use axum::Router;

use crate::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .nest("/inventory", inventory::inventory_routes())
        .nest("/orders", orders::admin_order_routes())
        .nest("/discounts", discounts::discount_routes())
        .nest("/users", users::user_routes())
        .nest("/reports", reports::report_routes())
}
