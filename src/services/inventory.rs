//! Admin inventory: absolute stock setting with an audit trail, plus the
//! back-office listing views.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order as SortDir, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_log::REASON_MANUAL_ADJUSTMENT;
use crate::entities::{inventory_log, product, InventoryLog, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::normalize_page;

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    /// Only products at or below the low-stock threshold.
    pub low_stock_only: bool,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    events: Arc<EventSender>,
    low_stock_threshold: i32,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, events: Arc<EventSender>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            events,
            low_stock_threshold,
        }
    }

    pub fn low_stock_threshold(&self) -> i32 {
        self.low_stock_threshold
    }

    /// Sets a product's stock to an absolute quantity and appends the delta
    /// to the inventory log, atomically. Setting the current value again is
    /// legal and still logs a zero-delta row.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        product_id: Uuid,
        new_quantity: i32,
        reason: Option<String>,
        admin_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Stock quantity must not be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let prod = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        let old_quantity = prod.stock_quantity;
        let delta = new_quantity - old_quantity;
        let now = Utc::now();

        let mut active: product::ActiveModel = prod.into();
        active.stock_quantity = Set(new_quantity);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let reason = reason.unwrap_or_else(|| REASON_MANUAL_ADJUSTMENT.to_string());
        inventory_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity_change: Set(delta),
            reason: Set(reason.clone()),
            reference_id: Set(None),
            admin_id: Set(Some(admin_id)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.events
            .send_or_log(Event::StockAdjusted {
                product_id,
                old_quantity,
                new_quantity,
                reason,
            })
            .await;

        Ok(updated)
    }

    /// Back-office inventory listing, inactive products included.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &InventoryFilter,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(filter.page, filter.limit);

        let mut condition = Condition::all();
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            condition = condition.add(
                Condition::any()
                    .add(product::Column::Name.contains(needle))
                    .add(product::Column::Slug.contains(needle)),
            );
        }
        if filter.low_stock_only {
            condition = condition.add(product::Column::StockQuantity.lte(self.low_stock_threshold));
        }

        let sort_column = match filter.sort_by.as_deref() {
            Some("name") => product::Column::Name,
            Some("stock_quantity") => product::Column::StockQuantity,
            Some("price") => product::Column::Price,
            _ => product::Column::CreatedAt,
        };
        let direction = if filter.sort_desc {
            SortDir::Desc
        } else {
            SortDir::Asc
        };

        let paginator = Product::find()
            .filter(condition)
            .order_by(sort_column, direction)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    /// Audit-log listing, newest first, optionally narrowed to one product.
    #[instrument(skip(self))]
    pub async fn list_log(
        &self,
        product_id: Option<Uuid>,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(Vec<inventory_log::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(page, limit);

        let mut query = InventoryLog::find().order_by_desc(inventory_log::Column::CreatedAt);
        if let Some(id) = product_id {
            query = query.filter(inventory_log::Column::ProductId.eq(id));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }
}
