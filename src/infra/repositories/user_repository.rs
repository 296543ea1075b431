//! User repository implementation with soft delete support.
//!
//! Every lookup except the login/registration email lookups is scoped to a
//! tenant.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{conflict_on_unique, fetch_page};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::{NewUser, User};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID within a tenant
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>>;

    /// Find active user by email (emails are globally unique)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Active users among `ids` that belong to the tenant
    async fn find_many(&self, tenant_id: Uuid, ids: Vec<Uuid>) -> AppResult<Vec<User>>;

    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<String>,
        role: Option<String>,
    ) -> AppResult<User>;

    /// Soft delete user by ID (sets deleted_at timestamp)
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user
    async fn restore(&self, tenant_id: Uuid, id: Uuid) -> AppResult<User>;

    /// Page of active users ordered by name
    async fn list(&self, tenant_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<User>, u64)>;

    /// Soft-deleted users of the tenant
    async fn list_deleted(&self, tenant_id: Uuid) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserRepository with soft delete
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_active_model(&self, tenant_id: Uuid, id: Uuid) -> AppResult<user::Model> {
        UserEntity::find_by_id(id)
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_id_with_deleted(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .filter(user::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_many(&self, tenant_id: Uuid, ids: Vec<Uuid>) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = UserEntity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::Id.is_in(ids))
            .filter(user::Column::DeletedAt.is_null())
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let model = new_user_model(new_user)
            .insert(&self.db)
            .await
            .map_err(|e| conflict_on_unique(e, "Email"))?;
        Ok(User::from(model))
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<String>,
        role: Option<String>,
    ) -> AppResult<User> {
        let mut active: ActiveModel = self.find_active_model(tenant_id, id).await?.into();

        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut active: ActiveModel = self.find_active_model(tenant_id, id).await?.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn restore(&self, tenant_id: Uuid, id: Uuid) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_not_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::validation("User is not deleted or does not exist"))?;

        let mut active: ActiveModel = user.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn list(&self, tenant_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<User>, u64)> {
        let select = UserEntity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null())
            .order_by_asc(user::Column::Name);

        let (models, total) = fetch_page(select, &self.db, params).await?;
        Ok((models.into_iter().map(User::from).collect(), total))
    }

    async fn list_deleted(&self, tenant_id: Uuid) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_not_null())
            .order_by_desc(user::Column::DeletedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }
}

/// Active model for a fresh user row; shared with the transactional store.
pub(crate) fn new_user_model(new_user: NewUser) -> ActiveModel {
    let now = chrono::Utc::now();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(new_user.tenant_id),
        email: Set(new_user.email),
        password_hash: Set(new_user.password_hash),
        name: Set(new_user.name),
        role: Set(new_user.role.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}
