//! Phone call repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::base::fetch_page;
use super::entities::phone_call::{self, ActiveModel, Entity as CallEntity};
use crate::domain::{CallStatus, PhoneCall};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PhoneRepository: Send + Sync {
    async fn create(&self, call: PhoneCall) -> AppResult<PhoneCall>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PhoneCall>>;

    /// Store `call` only while the row still has status `expected`.
    /// A concurrent transition turns into `StateConflict`.
    async fn update(&self, call: PhoneCall, expected: CallStatus) -> AppResult<PhoneCall>;

    /// Ringing or active call involving `user_id`
    async fn live_call_for(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Option<PhoneCall>>;

    /// Calls involving `user_id`, newest first
    async fn history(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<(Vec<PhoneCall>, u64)>;
}

pub struct PhoneStore {
    db: DatabaseConnection,
}

impl PhoneStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(call: PhoneCall) -> ActiveModel {
    ActiveModel {
        id: Set(call.id),
        tenant_id: Set(call.tenant_id),
        caller_id: Set(call.caller_id),
        callee_id: Set(call.callee_id),
        status: Set(call.status.as_str().to_string()),
        started_at: Set(call.started_at),
        answered_at: Set(call.answered_at),
        ended_at: Set(call.ended_at),
    }
}

fn involving(user_id: Uuid) -> Condition {
    Condition::any()
        .add(phone_call::Column::CallerId.eq(user_id))
        .add(phone_call::Column::CalleeId.eq(user_id))
}

#[async_trait]
impl PhoneRepository for PhoneStore {
    async fn create(&self, call: PhoneCall) -> AppResult<PhoneCall> {
        let model = to_active(call)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        PhoneCall::try_from(model)
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PhoneCall>> {
        CallEntity::find_by_id(id)
            .filter(phone_call::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(PhoneCall::try_from)
            .transpose()
    }

    async fn update(&self, call: PhoneCall, expected: CallStatus) -> AppResult<PhoneCall> {
        let result = CallEntity::update_many()
            .set(to_active(call.clone()))
            .filter(phone_call::Column::Id.eq(call.id))
            .filter(phone_call::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::state_conflict("The call changed meanwhile, reload it"));
        }
        Ok(call)
    }

    async fn live_call_for(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Option<PhoneCall>> {
        CallEntity::find()
            .filter(phone_call::Column::TenantId.eq(tenant_id))
            .filter(involving(user_id))
            .filter(phone_call::Column::Status.is_in([
                CallStatus::Ringing.as_str(),
                CallStatus::Active.as_str(),
            ]))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(PhoneCall::try_from)
            .transpose()
    }

    async fn history(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<(Vec<PhoneCall>, u64)> {
        let select = CallEntity::find()
            .filter(phone_call::Column::TenantId.eq(tenant_id))
            .filter(involving(user_id))
            .order_by_desc(phone_call::Column::StartedAt);

        let (models, total) = fetch_page(select, &self.db, params).await?;
        let calls = models
            .into_iter()
            .map(PhoneCall::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((calls, total))
    }
}
