//! Shopping carts for anonymous sessions and signed-in users.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{cart, cart_item, product, Cart, CartItem, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::Owner;

/// A cart line joined with the current product state. Prices are always the
/// product's current price; nothing is frozen until checkout.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    events: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, events: Arc<EventSender>) -> Self {
        Self { db, events }
    }

    fn owner_condition(owner: Owner) -> Condition {
        match owner {
            Owner::User(id) => Condition::all().add(cart::Column::UserId.eq(id)),
            Owner::Session(id) => Condition::all().add(cart::Column::SessionId.eq(id)),
        }
    }

    async fn find_cart<C: ConnectionTrait>(
        db: &C,
        owner: Owner,
    ) -> Result<Option<cart::Model>, ServiceError> {
        Ok(Cart::find().filter(Self::owner_condition(owner)).one(db).await?)
    }

    /// At most one cart exists per owner.
    pub async fn get_or_create(&self, owner: Owner) -> Result<cart::Model, ServiceError> {
        if let Some(found) = Self::find_cart(&*self.db, owner).await? {
            return Ok(found);
        }
        let (user_id, session_id) = match owner {
            Owner::User(id) => (Some(id), None),
            Owner::Session(id) => (None, Some(id)),
        };
        let now = Utc::now();
        let created = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_id: Set(session_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    /// Cart contents with the subtotal recomputed at current prices.
    #[instrument(skip(self))]
    pub async fn get(&self, owner: Owner) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create(owner).await?;
        Self::view(&*self.db, &cart).await
    }

    async fn view<C: ConnectionTrait>(
        db: &C,
        cart: &cart::Model,
    ) -> Result<CartView, ServiceError> {
        let rows: Vec<(cart_item::Model, Option<product::Model>)> = CartItem::find()
            .find_also_related(Product)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut subtotal = Decimal::ZERO;
        for (item, maybe_product) in rows {
            let Some(prod) = maybe_product else {
                // Product deleted out from under the cart; skip the line.
                continue;
            };
            let line_total = prod.price * Decimal::from(item.quantity);
            subtotal += line_total;
            items.push(CartLine {
                item_id: item.id,
                product_id: prod.id,
                name: prod.name,
                unit_price: prod.price,
                quantity: item.quantity,
                line_total,
            });
        }
        Ok(CartView {
            cart_id: cart.id,
            items,
            subtotal,
        })
    }

    /// Adds a product to the cart; an existing line for the same product has
    /// its quantity incremented instead.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: Owner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let cart = self.get_or_create(owner).await?;
        let now = Utc::now();

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        match existing {
            Some(line) => {
                let new_quantity = line.quantity + quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(new_quantity);
                active.updated_at = Set(now);
                active.update(&*self.db).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db)
                .await?;
            }
        }
        self.touch(&cart).await?;
        self.events
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id,
            })
            .await;
        Self::view(&*self.db, &cart).await
    }

    /// Sets a line's quantity; zero removes the line. The item must belong
    /// to the owner's cart.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        owner: Owner,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must not be negative".to_string(),
            ));
        }
        let cart = Self::find_cart(&*self.db, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        let line = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .filter(|l| l.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        if quantity == 0 {
            CartItem::delete_by_id(line.id).exec(&*self.db).await?;
        } else {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }
        self.touch(&cart).await?;
        Self::view(&*self.db, &cart).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, owner: Owner, item_id: Uuid) -> Result<CartView, ServiceError> {
        self.update_item(owner, item_id, 0).await
    }

    /// Empties the cart; the cart row itself persists.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: Owner) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create(owner).await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;
        self.touch(&cart).await?;
        self.events.send_or_log(Event::CartCleared(cart.id)).await;
        Self::view(&*self.db, &cart).await
    }

    /// On login: the anonymous session cart becomes the user's. When the
    /// user already has a cart, line quantities for the same product are
    /// summed and the session cart is deleted.
    #[instrument(skip(self))]
    pub async fn merge_into_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let Some(session_cart) = Self::find_cart(&txn, Owner::Session(session_id)).await? else {
            txn.commit().await?;
            return Ok(());
        };

        match Self::find_cart(&txn, Owner::User(user_id)).await? {
            None => {
                let mut active: cart::ActiveModel = session_cart.into();
                active.user_id = Set(Some(user_id));
                active.session_id = Set(None);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
            Some(user_cart) => {
                let session_lines = CartItem::find()
                    .filter(cart_item::Column::CartId.eq(session_cart.id))
                    .all(&txn)
                    .await?;
                let now = Utc::now();
                for line in session_lines {
                    let existing = CartItem::find()
                        .filter(cart_item::Column::CartId.eq(user_cart.id))
                        .filter(cart_item::Column::ProductId.eq(line.product_id))
                        .one(&txn)
                        .await?;
                    match existing {
                        Some(user_line) => {
                            let merged = user_line.quantity + line.quantity;
                            let mut active: cart_item::ActiveModel = user_line.into();
                            active.quantity = Set(merged);
                            active.updated_at = Set(now);
                            active.update(&txn).await?;
                        }
                        None => {
                            cart_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                cart_id: Set(user_cart.id),
                                product_id: Set(line.product_id),
                                quantity: Set(line.quantity),
                                created_at: Set(now),
                                updated_at: Set(now),
                            }
                            .insert(&txn)
                            .await?;
                        }
                    }
                }
                CartItem::delete_many()
                    .filter(cart_item::Column::CartId.eq(session_cart.id))
                    .exec(&txn)
                    .await?;
                Cart::delete_by_id(session_cart.id).exec(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn touch(&self, cart: &cart::Model) -> Result<(), ServiceError> {
        let mut active: cart::ActiveModel = cart.clone().into();
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }
}
