//! Back-office reporting. Row counts aggregate in the database; money sums
//! fold over fetched rows so Decimal arithmetic stays exact on every backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::OrderStatus;
use crate::entities::{
    order, order_item, page_view, product, user, Order, OrderItem, PageView, Product, User,
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    fn condition(&self, column: impl ColumnTrait) -> Condition {
        let mut condition = Condition::all();
        if let Some(start) = self.start {
            condition = condition.add(column.gte(start));
        }
        if let Some(end) = self.end {
            condition = condition.add(column.lte(end));
        }
        condition
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SalesSummary {
    pub revenue: Decimal,
    pub order_count: u64,
    pub average_order_value: Decimal,
    pub total_discount: Decimal,
    pub orders_by_status: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InventorySummary {
    pub product_count: u64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub units_on_hand: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CustomerSummary {
    pub total_customers: u64,
    pub new_customers: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TrafficSummary {
    pub page_views: u64,
    pub unique_sessions: u64,
    pub top_paths: Vec<PathCount>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DbPool>,
    low_stock_threshold: i32,
}

impl AnalyticsService {
    pub fn new(db: Arc<DbPool>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    /// Revenue, order counts, and discount totals over the range. Cancelled
    /// orders count toward the status breakdown but not toward revenue.
    #[instrument(skip(self))]
    pub async fn sales_summary(&self, range: DateRange) -> Result<SalesSummary, ServiceError> {
        let orders = Order::find()
            .filter(range.condition(order::Column::CreatedAt))
            .all(&*self.db)
            .await?;

        let mut orders_by_status: HashMap<String, u64> = HashMap::new();
        let mut revenue = Decimal::ZERO;
        let mut total_discount = Decimal::ZERO;
        let mut counted: u64 = 0;
        for o in &orders {
            *orders_by_status
                .entry(format!("{:?}", o.status).to_lowercase())
                .or_default() += 1;
            if o.status != OrderStatus::Cancelled {
                revenue += o.total_amount;
                total_discount += o.discount_amount;
                counted += 1;
            }
        }
        let average_order_value = if counted == 0 {
            Decimal::ZERO
        } else {
            revenue / Decimal::from(counted)
        };

        Ok(SalesSummary {
            revenue,
            order_count: counted,
            average_order_value,
            total_discount,
            orders_by_status,
        })
    }

    /// Best sellers over the range, by units with revenue alongside.
    #[instrument(skip(self))]
    pub async fn top_products(
        &self,
        range: DateRange,
        limit: usize,
    ) -> Result<Vec<TopProduct>, ServiceError> {
        let items = OrderItem::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(range.condition(order::Column::CreatedAt))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .all(&*self.db)
            .await?;

        let mut per_product: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
        for item in items {
            let entry = per_product.entry(item.product_id).or_default();
            entry.0 += item.quantity as i64;
            entry.1 += item.unit_price * Decimal::from(item.quantity);
        }

        let mut ranked: Vec<(Uuid, (i64, Decimal))> = per_product.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(b.1 .1.cmp(&a.1 .1)));
        ranked.truncate(limit.clamp(1, 100));

        let mut out = Vec::with_capacity(ranked.len());
        for (product_id, (units_sold, revenue)) in ranked {
            let name = Product::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| "(removed)".to_string());
            out.push(TopProduct {
                product_id,
                name,
                units_sold,
                revenue,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn inventory_summary(&self) -> Result<InventorySummary, ServiceError> {
        let product_count = Product::find().count(&*self.db).await?;
        let low_stock_count = Product::find()
            .filter(product::Column::StockQuantity.lte(self.low_stock_threshold))
            .filter(product::Column::StockQuantity.gt(0))
            .count(&*self.db)
            .await?;
        let out_of_stock_count = Product::find()
            .filter(product::Column::StockQuantity.lte(0))
            .count(&*self.db)
            .await?;
        let units_on_hand = Product::find()
            .all(&*self.db)
            .await?
            .iter()
            .map(|p| p.stock_quantity as i64)
            .sum();

        Ok(InventorySummary {
            product_count,
            low_stock_count,
            out_of_stock_count,
            units_on_hand,
        })
    }

    #[instrument(skip(self))]
    pub async fn customer_summary(&self, range: DateRange) -> Result<CustomerSummary, ServiceError> {
        let total_customers = User::find()
            .filter(user::Column::Role.eq(user::UserRole::Customer))
            .count(&*self.db)
            .await?;
        let new_customers = User::find()
            .filter(user::Column::Role.eq(user::UserRole::Customer))
            .filter(range.condition(user::Column::CreatedAt))
            .count(&*self.db)
            .await?;
        Ok(CustomerSummary {
            total_customers,
            new_customers,
        })
    }

    /// Page view volume over the range with the ten most-hit paths.
    #[instrument(skip(self))]
    pub async fn traffic_summary(&self, range: DateRange) -> Result<TrafficSummary, ServiceError> {
        let views: Vec<(Option<Uuid>, String)> = PageView::find()
            .filter(range.condition(page_view::Column::ViewedAt))
            .select_only()
            .column(page_view::Column::SessionId)
            .column(page_view::Column::Path)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let page_views = views.len() as u64;
        let unique_sessions = views
            .iter()
            .filter_map(|(session, _)| *session)
            .collect::<std::collections::HashSet<_>>()
            .len() as u64;

        let mut by_path: HashMap<String, u64> = HashMap::new();
        for (_, path) in views {
            *by_path.entry(path).or_default() += 1;
        }
        let mut top_paths: Vec<PathCount> = by_path
            .into_iter()
            .map(|(path, count)| PathCount { path, count })
            .collect();
        top_paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        top_paths.truncate(10);

        Ok(TrafficSummary {
            page_views,
            unique_sessions,
            top_paths,
        })
    }
}
