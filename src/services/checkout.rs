//! Order placement. Every check and mutation happens inside one database
//! transaction; a failure anywhere rolls the whole attempt back, so stock,
//! the inventory log, discount usage, and the cart always agree.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_log::REASON_ORDER;
use crate::entities::order::OrderStatus;
use crate::entities::{
    cart, cart_item, discount_code, inventory_log, order, order_item, product, Cart, CartItem,
    DiscountCode, Product,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// How the supplied discount code fared. An ineligible code never fails the
/// order; it degrades to zero discount and reports why here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountOutcome {
    Applied,
    NotFound,
    Expired,
    Exhausted,
    BelowMinimum,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CheckoutResult {
    pub order_id: Uuid,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub discount_outcome: Option<DiscountOutcome>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub user_id: Uuid,
    pub shipping_address: String,
    pub billing_address: String,
    pub payment_method: String,
    pub discount_code: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    events: Arc<EventSender>,
}

/// Discount owed for a given code state and subtotal, plus the outcome tag.
/// Percentage wins when both percent and amount are set.
pub(crate) fn evaluate_discount(
    code: &discount_code::Model,
    subtotal: Decimal,
    now: chrono::DateTime<Utc>,
) -> (Decimal, DiscountOutcome) {
    if code.valid_from.is_some_and(|from| now < from)
        || code.valid_to.is_some_and(|to| now > to)
    {
        return (Decimal::ZERO, DiscountOutcome::Expired);
    }
    if code.max_uses.is_some_and(|cap| code.times_used >= cap) {
        return (Decimal::ZERO, DiscountOutcome::Exhausted);
    }
    if subtotal < code.minimum_order_amount {
        return (Decimal::ZERO, DiscountOutcome::BelowMinimum);
    }
    let discount = match (code.discount_percent, code.discount_amount) {
        (Some(percent), _) => subtotal * percent / Decimal::from(100),
        (None, Some(amount)) => amount,
        (None, None) => Decimal::ZERO,
    };
    (discount, DiscountOutcome::Applied)
}

impl CheckoutService {
    pub fn new(db: Arc<DbPool>, events: Arc<EventSender>) -> Self {
        Self { db, events }
    }

    /// Places an order from the user's cart.
    ///
    /// Stock is checked for every line before anything mutates; a single
    /// short line fails the whole order with a 400 naming the product. On
    /// success the order and its frozen-price items exist, stock is
    /// decremented with matching inventory-log rows, a used discount's
    /// counter is bumped once, and the cart is emptied (the cart row stays).
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn place_order(
        &self,
        input: PlaceOrderInput,
    ) -> Result<CheckoutResult, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(input.user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        // Load and stock-check every line up front; no partial fulfillment.
        let mut priced: Vec<(cart_item::Model, product::Model)> = Vec::with_capacity(lines.len());
        for line in lines {
            let prod = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;
            if prod.stock_quantity < line.quantity {
                return Err(ServiceError::InsufficientStock {
                    product_id: prod.id,
                    requested: line.quantity,
                    available: prod.stock_quantity,
                });
            }
            priced.push((line, prod));
        }

        let subtotal: Decimal = priced
            .iter()
            .map(|(line, prod)| prod.price * Decimal::from(line.quantity))
            .sum();

        let (discount_amount, discount_outcome, discount_row) = match input.discount_code.as_deref()
        {
            None => (Decimal::ZERO, None, None),
            Some(code_str) => {
                let found = DiscountCode::find()
                    .filter(discount_code::Column::Code.eq(code_str))
                    .one(&txn)
                    .await?;
                match found {
                    None => (Decimal::ZERO, Some(DiscountOutcome::NotFound), None),
                    Some(code) => {
                        let (amount, outcome) = evaluate_discount(&code, subtotal, now);
                        let row = (outcome == DiscountOutcome::Applied).then_some(code);
                        (amount, Some(outcome), row)
                    }
                }
            }
        };

        // Clamp: a flat discount larger than the subtotal never goes negative.
        let total_amount = (subtotal - discount_amount).max(Decimal::ZERO);

        let order_id = Uuid::new_v4();
        order::ActiveModel {
            id: Set(order_id),
            user_id: Set(input.user_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total_amount),
            discount_amount: Set(discount_amount),
            discount_code_id: Set(discount_row.as_ref().map(|c| c.id)),
            shipping_address: Set(input.shipping_address),
            billing_address: Set(input.billing_address),
            payment_method: Set(input.payment_method),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (line, prod) in &priced {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(prod.id),
                quantity: Set(line.quantity),
                unit_price: Set(prod.price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let mut active: product::ActiveModel = prod.clone().into();
            active.stock_quantity = Set(prod.stock_quantity - line.quantity);
            active.updated_at = Set(now);
            active.update(&txn).await?;

            inventory_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(prod.id),
                quantity_change: Set(-line.quantity),
                reason: Set(REASON_ORDER.to_string()),
                reference_id: Set(Some(order_id)),
                admin_id: Set(None),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        if let Some(code) = &discount_row {
            let mut active: discount_code::ActiveModel = code.clone().into();
            active.times_used = Set(code.times_used + 1);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.events
            .send_or_log(Event::OrderPlaced {
                order_id,
                user_id: input.user_id,
            })
            .await;
        if let Some(code) = &discount_row {
            self.events
                .send_or_log(Event::DiscountApplied {
                    code_id: code.id,
                    order_id,
                })
                .await;
        }

        Ok(CheckoutResult {
            order_id,
            total_amount,
            discount_amount,
            discount_outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn code(percent: Option<Decimal>, amount: Option<Decimal>) -> discount_code::Model {
        discount_code::Model {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            discount_percent: percent,
            discount_amount: amount,
            minimum_order_amount: Decimal::ZERO,
            valid_from: None,
            valid_to: None,
            max_uses: None,
            times_used: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_on_qualifying_subtotal() {
        let mut c = code(Some(dec!(15)), None);
        c.minimum_order_amount = dec!(50);
        let (amount, outcome) = evaluate_discount(&c, dec!(120), Utc::now());
        assert_eq!(outcome, DiscountOutcome::Applied);
        assert_eq!(amount, dec!(18));
    }

    #[test]
    fn percentage_wins_over_flat_amount() {
        let c = code(Some(dec!(10)), Some(dec!(99)));
        let (amount, outcome) = evaluate_discount(&c, dec!(200), Utc::now());
        assert_eq!(outcome, DiscountOutcome::Applied);
        assert_eq!(amount, dec!(20));
    }

    #[test]
    fn below_minimum_degrades_to_zero() {
        let mut c = code(Some(dec!(15)), None);
        c.minimum_order_amount = dec!(50);
        let (amount, outcome) = evaluate_discount(&c, dec!(49.99), Utc::now());
        assert_eq!(outcome, DiscountOutcome::BelowMinimum);
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn exhausted_cap_degrades_to_zero() {
        let mut c = code(Some(dec!(15)), None);
        c.max_uses = Some(3);
        c.times_used = 3;
        let (amount, outcome) = evaluate_discount(&c, dec!(100), Utc::now());
        assert_eq!(outcome, DiscountOutcome::Exhausted);
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn outside_validity_window_degrades_to_zero() {
        let now = Utc::now();
        let mut c = code(Some(dec!(15)), None);
        c.valid_from = Some(now + Duration::days(1));
        assert_eq!(
            evaluate_discount(&c, dec!(100), now).1,
            DiscountOutcome::Expired
        );

        c.valid_from = None;
        c.valid_to = Some(now - Duration::days(1));
        assert_eq!(
            evaluate_discount(&c, dec!(100), now).1,
            DiscountOutcome::Expired
        );
    }

    #[test]
    fn flat_discount_larger_than_subtotal_clamps_total_at_zero() {
        let c = code(None, Some(dec!(150)));
        let subtotal = dec!(100);
        let (amount, outcome) = evaluate_discount(&c, subtotal, Utc::now());
        assert_eq!(outcome, DiscountOutcome::Applied);
        assert_eq!((subtotal - amount).max(Decimal::ZERO), Decimal::ZERO);
    }
}
