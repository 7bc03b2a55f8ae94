//! Admin discount-code management. `times_used` is only ever written by
//! checkout; this service never touches it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{discount_code, DiscountCode};
use crate::errors::ServiceError;
use crate::services::normalize_page;

#[derive(Debug, Clone)]
pub struct DiscountInput {
    pub code: String,
    pub discount_percent: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub minimum_order_amount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
}

fn validate_input(input: &DiscountInput) -> Result<(), ServiceError> {
    if input.code.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Code must not be empty".to_string(),
        ));
    }
    if input.discount_percent.is_none() && input.discount_amount.is_none() {
        return Err(ServiceError::ValidationError(
            "Either a percentage or a fixed amount is required".to_string(),
        ));
    }
    if let Some(percent) = input.discount_percent {
        if percent <= Decimal::ZERO || percent > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "Percentage must be greater than 0 and at most 100".to_string(),
            ));
        }
    }
    if let Some(amount) = input.discount_amount {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Fixed amount must be greater than 0".to_string(),
            ));
        }
    }
    if input.max_uses.is_some_and(|cap| cap < 1) {
        return Err(ServiceError::ValidationError(
            "max_uses must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct DiscountService {
    db: Arc<DbPool>,
}

impl DiscountService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: DiscountInput) -> Result<discount_code::Model, ServiceError> {
        validate_input(&input)?;

        let duplicate = DiscountCode::find()
            .filter(discount_code::Column::Code.eq(input.code.as_str()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Discount code {} already exists",
                input.code
            )));
        }

        let now = Utc::now();
        let created = discount_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code),
            discount_percent: Set(input.discount_percent),
            discount_amount: Set(input.discount_amount),
            minimum_order_amount: Set(input.minimum_order_amount.unwrap_or(Decimal::ZERO)),
            valid_from: Set(input.valid_from),
            valid_to: Set(input.valid_to),
            max_uses: Set(input.max_uses),
            times_used: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
        active_only: bool,
    ) -> Result<(Vec<discount_code::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(page, limit);

        let mut condition = Condition::all();
        if active_only {
            let now = Utc::now();
            condition = condition
                .add(
                    Condition::any()
                        .add(discount_code::Column::ValidFrom.is_null())
                        .add(discount_code::Column::ValidFrom.lte(now)),
                )
                .add(
                    Condition::any()
                        .add(discount_code::Column::ValidTo.is_null())
                        .add(discount_code::Column::ValidTo.gte(now)),
                );
        }

        let paginator = DiscountCode::find()
            .filter(condition)
            .order_by_desc(discount_code::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<discount_code::Model, ServiceError> {
        DiscountCode::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Discount code {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: DiscountInput,
    ) -> Result<discount_code::Model, ServiceError> {
        validate_input(&input)?;
        let found = self.get(id).await?;

        if input.code != found.code {
            let duplicate = DiscountCode::find()
                .filter(discount_code::Column::Code.eq(input.code.as_str()))
                .one(&*self.db)
                .await?;
            if duplicate.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Discount code {} already exists",
                    input.code
                )));
            }
        }

        let mut active: discount_code::ActiveModel = found.into();
        active.code = Set(input.code);
        active.discount_percent = Set(input.discount_percent);
        active.discount_amount = Set(input.discount_amount);
        if let Some(minimum) = input.minimum_order_amount {
            active.minimum_order_amount = Set(minimum);
        }
        active.valid_from = Set(input.valid_from);
        active.valid_to = Set(input.valid_to);
        active.max_uses = Set(input.max_uses);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let res = DiscountCode::delete_by_id(id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Discount code {} not found",
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> DiscountInput {
        DiscountInput {
            code: "SAVE10".to_string(),
            discount_percent: Some(dec!(10)),
            discount_amount: None,
            minimum_order_amount: None,
            valid_from: None,
            valid_to: None,
            max_uses: None,
        }
    }

    #[test]
    fn requires_percent_or_amount() {
        let mut bad = input();
        bad.discount_percent = None;
        assert!(matches!(
            validate_input(&bad),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let mut bad = input();
        bad.discount_percent = Some(dec!(0));
        assert!(validate_input(&bad).is_err());
        bad.discount_percent = Some(dec!(100.01));
        assert!(validate_input(&bad).is_err());
        bad.discount_percent = Some(dec!(100));
        assert!(validate_input(&bad).is_ok());
    }
}
