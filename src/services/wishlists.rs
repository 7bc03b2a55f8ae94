//! Per-user wishlists. One wishlist per user, one entry per product.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{product, wishlist, wishlist_item, Product, Wishlist, WishlistItem};
use crate::errors::ServiceError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct WishlistEntry {
    pub item_id: Uuid,
    pub product: product::Model,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WishlistView {
    pub wishlist_id: Uuid,
    pub items: Vec<WishlistEntry>,
}

#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DbPool>,
}

impl WishlistService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn get_or_create(&self, user_id: Uuid) -> Result<wishlist::Model, ServiceError> {
        if let Some(found) = Wishlist::find()
            .filter(wishlist::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(found);
        }
        let created = wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> Result<WishlistView, ServiceError> {
        let wishlist = self.get_or_create(user_id).await?;
        let rows: Vec<(wishlist_item::Model, Option<product::Model>)> = WishlistItem::find()
            .find_also_related(Product)
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let items = rows
            .into_iter()
            .filter_map(|(item, prod)| {
                prod.map(|product| WishlistEntry {
                    item_id: item.id,
                    product,
                })
            })
            .collect();
        Ok(WishlistView {
            wishlist_id: wishlist.id,
            items,
        })
    }

    /// Adding a product already on the list is a no-op, not an error.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistView, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let wishlist = self.get_or_create(user_id).await?;
        let existing = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        if existing.is_none() {
            wishlist_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                wishlist_id: Set(wishlist.id),
                product_id: Set(product_id),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await?;
        }
        self.get(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistView, ServiceError> {
        let wishlist = self.get_or_create(user_id).await?;
        WishlistItem::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        self.get(user_id).await
    }
}
