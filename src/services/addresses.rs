//! Shipping address book, scoped to the owning user.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{shipping_address, ShippingAddress};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct AddressInput {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

fn validate_input(input: &AddressInput) -> Result<(), ServiceError> {
    for (field, value) in [
        ("recipient", &input.recipient),
        ("line1", &input.line1),
        ("city", &input.city),
        ("postal_code", &input.postal_code),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "{} must not be empty",
                field
            )));
        }
    }
    if input.country.trim().len() != 2 {
        return Err(ServiceError::ValidationError(
            "country must be a two-letter code".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AddressService {
    db: Arc<DbPool>,
}

impl AddressService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<shipping_address::Model>, ServiceError> {
        Ok(ShippingAddress::find()
            .filter(shipping_address::Column::UserId.eq(user_id))
            .order_by_desc(shipping_address::Column::IsDefault)
            .order_by_desc(shipping_address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Creates an address. Setting it default clears the previous default in
    /// the same transaction.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<shipping_address::Model, ServiceError> {
        validate_input(&input)?;
        let txn = self.db.begin().await?;

        if input.is_default {
            Self::clear_default(&txn, user_id).await?;
        }
        let now = Utc::now();
        let created = shipping_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            recipient: Set(input.recipient.trim().to_string()),
            line1: Set(input.line1.trim().to_string()),
            line2: Set(input.line2.map(|l| l.trim().to_string())),
            city: Set(input.city.trim().to_string()),
            state: Set(input.state.trim().to_string()),
            postal_code: Set(input.postal_code.trim().to_string()),
            country: Set(input.country.trim().to_uppercase()),
            is_default: Set(input.is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<shipping_address::Model, ServiceError> {
        validate_input(&input)?;
        let txn = self.db.begin().await?;

        let found = ShippingAddress::find_by_id(address_id)
            .one(&txn)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))?;

        if input.is_default && !found.is_default {
            Self::clear_default(&txn, user_id).await?;
        }

        let mut active: shipping_address::ActiveModel = found.into();
        active.recipient = Set(input.recipient.trim().to_string());
        active.line1 = Set(input.line1.trim().to_string());
        active.line2 = Set(input.line2.map(|l| l.trim().to_string()));
        active.city = Set(input.city.trim().to_string());
        active.state = Set(input.state.trim().to_string());
        active.postal_code = Set(input.postal_code.trim().to_string());
        active.country = Set(input.country.trim().to_uppercase());
        active.is_default = Set(input.is_default);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let res = ShippingAddress::delete_many()
            .filter(shipping_address::Column::Id.eq(address_id))
            .filter(shipping_address::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound("Address not found".to_string()));
        }
        Ok(())
    }

    async fn clear_default<C: sea_orm::ConnectionTrait>(
        txn: &C,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        ShippingAddress::update_many()
            .col_expr(
                shipping_address::Column::IsDefault,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(shipping_address::Column::UserId.eq(user_id))
            .filter(shipping_address::Column::IsDefault.eq(true))
            .exec(txn)
            .await?;
        Ok(())
    }
}
