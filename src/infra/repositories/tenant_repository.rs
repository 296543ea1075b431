//! Tenant repository.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::base::conflict_on_unique;
use super::entities::tenant::{self, ActiveModel, Entity as TenantEntity};
use crate::domain::Tenant;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>>;

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Tenant>>;

    async fn create(&self, name: String, slug: String) -> AppResult<Tenant>;
}

pub struct TenantStore {
    db: DatabaseConnection,
}

impl TenantStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TenantRepository for TenantStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>> {
        let result = TenantEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Tenant::from))
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Tenant>> {
        let result = TenantEntity::find()
            .filter(tenant::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Tenant::from))
    }

    async fn create(&self, name: String, slug: String) -> AppResult<Tenant> {
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            created_at: Set(chrono::Utc::now()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| conflict_on_unique(e, "Tenant"))?;
        Ok(Tenant::from(model))
    }
}
