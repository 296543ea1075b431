//! Remote desktop session repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::remote_session::{self, ActiveModel, Entity as SessionEntity};
use crate::domain::{RemoteSession, SessionStatus};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RemoteSessionRepository: Send + Sync {
    async fn create(&self, session: RemoteSession) -> AppResult<RemoteSession>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<RemoteSession>>;

    /// Store `session` only while the row still has status `expected`
    async fn update(
        &self,
        session: RemoteSession,
        expected: SessionStatus,
    ) -> AppResult<RemoteSession>;

    /// Sessions where `user_id` is host or controller, newest first
    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<RemoteSession>>;
}

pub struct RemoteSessionStore {
    db: DatabaseConnection,
}

impl RemoteSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(session: RemoteSession) -> ActiveModel {
    ActiveModel {
        id: Set(session.id),
        tenant_id: Set(session.tenant_id),
        host_id: Set(session.host_id),
        controller_id: Set(session.controller_id),
        status: Set(session.status.as_str().to_string()),
        screen_width: Set(session.screen_width),
        screen_height: Set(session.screen_height),
        created_at: Set(session.created_at),
        started_at: Set(session.started_at),
        ended_at: Set(session.ended_at),
    }
}

#[async_trait]
impl RemoteSessionRepository for RemoteSessionStore {
    async fn create(&self, session: RemoteSession) -> AppResult<RemoteSession> {
        let model = to_active(session)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        RemoteSession::try_from(model)
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<RemoteSession>> {
        SessionEntity::find_by_id(id)
            .filter(remote_session::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(RemoteSession::try_from)
            .transpose()
    }

    async fn update(
        &self,
        session: RemoteSession,
        expected: SessionStatus,
    ) -> AppResult<RemoteSession> {
        let result = SessionEntity::update_many()
            .set(to_active(session.clone()))
            .filter(remote_session::Column::Id.eq(session.id))
            .filter(remote_session::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::state_conflict("The session changed meanwhile, reload it"));
        }
        Ok(session)
    }

    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<RemoteSession>> {
        SessionEntity::find()
            .filter(remote_session::Column::TenantId.eq(tenant_id))
            .filter(
                Condition::any()
                    .add(remote_session::Column::HostId.eq(user_id))
                    .add(remote_session::Column::ControllerId.eq(user_id)),
            )
            .order_by_desc(remote_session::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(RemoteSession::try_from)
            .collect()
    }
}
