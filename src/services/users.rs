//! Account registration, login, and the admin user directory.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::db::DbPool;
use crate::entities::user::UserRole;
use crate::entities::{user, User};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::normalize_page;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    events: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, events: Arc<EventSender>) -> Self {
        Self { db, events }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<user::Model, ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }

        let duplicate = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            name: Set(name.trim().to_string()),
            role: Set(UserRole::Customer),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.events
            .send_or_log(Event::UserRegistered(created.id))
            .await;
        Ok(created)
    }

    /// Verifies credentials. Unknown email and wrong password produce the
    /// same error, so the endpoint does not leak which accounts exist.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let email = email.trim().to_lowercase();
        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let found = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&found.password_hash, password)? {
            return Err(invalid());
        }
        Ok(found)
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    /// Admin directory with email/name search.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
        search: Option<&str>,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let (page, limit) = normalize_page(page, limit);

        let mut condition = Condition::all();
        if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(user::Column::Email.contains(needle))
                    .add(user::Column::Name.contains(needle)),
            );
        }

        let paginator = User::find()
            .filter(condition)
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    /// Changes a user's role. An admin cannot demote their own account, so
    /// the system always retains at least the acting admin.
    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        acting_admin: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        if acting_admin == user_id && role != UserRole::Admin {
            return Err(ServiceError::InvalidOperation(
                "Admins cannot demote their own account".to_string(),
            ));
        }
        let found = self.get(user_id).await?;
        let mut active: user::ActiveModel = found.into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }
}
