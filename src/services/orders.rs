//! Order queries and the admin status workflow.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order as SortDir, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::OrderStatus;
use crate::entities::{order, order_item, Order, OrderItem};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::normalize_page;

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Matches a full order id or a shipping address substring.
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    events: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, events: Arc<EventSender>) -> Self {
        Self { db, events }
    }

    /// Admin listing with status/date/search filters. Out-of-range pages
    /// return an empty page with correct metadata, never an error.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(filter.page, filter.limit);

        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(order::Column::Status.eq(status));
        }
        if let Some(start) = filter.start_date {
            condition = condition.add(order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            condition = condition.add(order::Column::CreatedAt.lte(end));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            let mut any = Condition::any().add(order::Column::ShippingAddress.contains(needle));
            // A full order id in the search box matches exactly.
            if let Ok(id) = Uuid::parse_str(needle) {
                any = any.add(order::Column::Id.eq(id));
            }
            condition = condition.add(any);
        }

        let sort_column = match filter.sort_by.as_deref() {
            Some("total_amount") => order::Column::TotalAmount,
            Some("status") => order::Column::Status,
            _ => order::Column::CreatedAt,
        };
        let direction = if filter.sort_desc {
            SortDir::Desc
        } else {
            SortDir::Asc
        };

        let paginator = Order::find()
            .filter(condition)
            .order_by(sort_column, direction)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    /// A user's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(page, limit);
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    /// Order with its items. `scope_to_user` restricts the lookup to the
    /// given owner so customers cannot read each other's orders.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        id: Uuid,
        scope_to_user: Option<Uuid>,
    ) -> Result<OrderDetail, ServiceError> {
        let found = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|o| scope_to_user.map_or(true, |uid| o.user_id == uid))
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(id))
            .all(&*self.db)
            .await?;
        Ok(OrderDetail {
            order: found,
            items,
        })
    }

    /// Applies an admin status transition. Illegal transitions are a 400;
    /// cancellation does not return stock.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let found = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let old_status = found.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "{:?} -> {:?}",
                old_status, new_status
            )));
        }

        let mut active: order::ActiveModel = found.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.events
            .send_or_log(Event::OrderStatusChanged {
                order_id: id,
                old_status: format!("{:?}", old_status).to_lowercase(),
                new_status: format!("{:?}", new_status).to_lowercase(),
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderStatus::Pending, OrderStatus::Processing, true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Delivered, false)]
    #[test_case(OrderStatus::Processing, OrderStatus::Shipped, true)]
    #[test_case(OrderStatus::Processing, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Shipped, OrderStatus::Delivered, true)]
    #[test_case(OrderStatus::Shipped, OrderStatus::Cancelled, false)]
    #[test_case(OrderStatus::Delivered, OrderStatus::Pending, false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Pending, false)]
    fn status_transition_table(from: OrderStatus, to: OrderStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
