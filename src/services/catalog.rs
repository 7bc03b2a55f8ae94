//! Product catalog: browsing, 3D asset selection, view tracking, reviews.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order as SortDir, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{
    category, page_view, product, product_image, product_model, recently_viewed, review,
    Category, Product, ProductImage, ProductModel, RecentlyViewed, Review,
};
use crate::entities::product_model::{ModelFormat, ModelResolution};
use crate::errors::ServiceError;
use crate::services::{normalize_page, Owner};

/// Most recent products remembered per owner.
const RECENTLY_VIEWED_CAP: u64 = 20;

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    /// Admin surfaces list inactive products too.
    pub include_inactive: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub models: Vec<product_model::Model>,
    pub average_rating: Option<f64>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Paginated, filtered product listing. The count and the page share one
    /// predicate, so the metadata always matches the rows.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(filter.page, filter.limit);

        let mut condition = Condition::all();
        if !filter.include_inactive {
            condition = condition.add(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            condition = condition.add(
                Condition::any()
                    .add(product::Column::Name.contains(needle))
                    .add(product::Column::Description.contains(needle)),
            );
        }

        // Unknown sort fields fall back to created_at rather than erroring.
        let sort_column = match filter.sort_by.as_deref() {
            Some("name") => product::Column::Name,
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

    /// Product with its images, 3D assets, and review average. Inactive
    /// products are hidden unless `include_inactive`.
    #[instrument(skip(self))]
    pub async fn get_product(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductDetail, ServiceError> {
        let found = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|p| include_inactive || p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(id))
            .order_by_asc(product_image::Column::Position)
            .all(&*self.db)
            .await?;
        let models = ProductModel::find()
            .filter(product_model::Column::ProductId.eq(id))
            .all(&*self.db)
            .await?;

        let ratings: Vec<i16> = Review::find()
            .filter(review::Column::ProductId.eq(id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64)
        };

        Ok(ProductDetail {
            product: found,
            images,
            models,
            average_rating,
        })
    }

    /// Picks the 3D asset to serve: the highest resolution not above the
    /// requested quality, preferring the requested format, falling back to
    /// any asset the product has.
    #[instrument(skip(self))]
    pub async fn resolve_model(
        &self,
        product_id: Uuid,
        quality: Option<ModelResolution>,
        format: Option<ModelFormat>,
    ) -> Result<product_model::Model, ServiceError> {
        let models = ProductModel::find()
            .filter(product_model::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        if models.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No 3D model for product {}",
                product_id
            )));
        }

        let ceiling = quality.unwrap_or(ModelResolution::High);
        let pick = |candidates: &[product_model::Model]| {
            candidates
                .iter()
                .filter(|m| m.resolution <= ceiling)
                .max_by_key(|m| m.resolution)
                .or_else(|| candidates.iter().min_by_key(|m| m.resolution))
                .cloned()
        };

        if let Some(wanted) = format {
            let matching: Vec<_> = models.iter().filter(|m| m.format == wanted).cloned().collect();
            if let Some(found) = pick(&matching) {
                return Ok(found);
            }
        }
        pick(&models).ok_or_else(|| {
            ServiceError::NotFound(format!("No 3D model for product {}", product_id))
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Records a product page view for analytics and refreshes the owner's
    /// recently-viewed list, trimming it past the cap.
    #[instrument(skip(self))]
    pub async fn record_view(
        &self,
        owner: Owner,
        product_id: Uuid,
        path: &str,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let (user_id, session_id) = match owner {
            Owner::User(id) => (Some(id), None),
            Owner::Session(id) => (None, Some(id)),
        };

        page_view::ActiveModel {
            id: Set(Uuid::new_v4()),
            path: Set(path.to_string()),
            session_id: Set(session_id),
            user_id: Set(user_id),
            viewed_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        let existing = RecentlyViewed::find()
            .filter(self.owner_condition(owner))
            .filter(recently_viewed::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        match existing {
            Some(row) => {
                let mut active: recently_viewed::ActiveModel = row.into();
                active.viewed_at = Set(now);
                active.update(&*self.db).await?;
            }
            None => {
                recently_viewed::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    session_id: Set(session_id),
                    product_id: Set(product_id),
                    viewed_at: Set(now),
                }
                .insert(&*self.db)
                .await?;
                self.trim_recently_viewed(owner).await?;
            }
        }
        Ok(())
    }

    async fn trim_recently_viewed(&self, owner: Owner) -> Result<(), ServiceError> {
        let rows = RecentlyViewed::find()
            .filter(self.owner_condition(owner))
            .order_by_desc(recently_viewed::Column::ViewedAt)
            .all(&*self.db)
            .await?;
        for stale in rows.into_iter().skip(RECENTLY_VIEWED_CAP as usize) {
            RecentlyViewed::delete_by_id(stale.id).exec(&*self.db).await?;
        }
        Ok(())
    }

    /// Most recently viewed products for the owner, newest first.
    pub async fn recently_viewed(
        &self,
        owner: Owner,
        limit: u64,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let rows = RecentlyViewed::find()
            .filter(self.owner_condition(owner))
            .order_by_desc(recently_viewed::Column::ViewedAt)
            .paginate(&*self.db, limit.clamp(1, RECENTLY_VIEWED_CAP))
            .fetch_page(0)
            .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(found) = Product::find_by_id(row.product_id)
                .one(&*self.db)
                .await?
                .filter(|p| p.is_active)
            {
                products.push(found);
            }
        }
        Ok(products)
    }

    pub async fn list_reviews(
        &self,
        product_id: Uuid,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(Vec<review::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(page, limit);
        let paginator = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    /// One review per user per product; a second submission replaces the
    /// first.
    #[instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<review::Model, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;
        let saved = match existing {
            Some(row) => {
                let mut active: review::ActiveModel = row.into();
                active.rating = Set(rating);
                active.comment = Set(comment);
                active.update(&*self.db).await?
            }
            None => {
                review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    user_id: Set(user_id),
                    rating: Set(rating),
                    comment: Set(comment),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?
            }
        };
        Ok(saved)
    }

    fn owner_condition(&self, owner: Owner) -> Condition {
        match owner {
            Owner::User(id) => Condition::all().add(recently_viewed::Column::UserId.eq(id)),
            Owner::Session(id) => Condition::all().add(recently_viewed::Column::SessionId.eq(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_ordering_matches_quality_ladder() {
        assert!(ModelResolution::Low < ModelResolution::Medium);
        assert!(ModelResolution::Medium < ModelResolution::High);
    }
}
