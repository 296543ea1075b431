//! Notification repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::base::fetch_page;
use super::entities::notification::{self, ActiveModel, Entity as NotificationEntity};
use crate::domain::Notification;
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> AppResult<Notification>;

    /// Notifications of `user_id`, newest first
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: &PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)>;

    /// Returns false if no unread notification matched
    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;

    /// Returns the number of notifications marked
    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;
}

pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for NotificationStore {
    async fn create(&self, n: Notification) -> AppResult<Notification> {
        let model = ActiveModel {
            id: Set(n.id),
            tenant_id: Set(n.tenant_id),
            user_id: Set(n.user_id),
            kind: Set(n.kind),
            payload: Set(n.payload),
            read_at: Set(n.read_at),
            created_at: Set(n.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(AppError::from)?;

        Ok(Notification::from(model))
    }

    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: &PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let mut select = NotificationEntity::find().filter(notification::Column::UserId.eq(user_id));
        if unread_only {
            select = select.filter(notification::Column::ReadAt.is_null());
        }
        let select = select.order_by_desc(notification::Column::CreatedAt);

        let (models, total) = fetch_page(select, &self.db, params).await?;
        Ok((models.into_iter().map(Notification::from).collect(), total))
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = NotificationEntity::update_many()
            .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::ReadAt.is_null())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = NotificationEntity::update_many()
            .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::ReadAt.is_null())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected)
    }
}
