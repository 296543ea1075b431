//! Calendar event repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::calendar_event::{self, ActiveModel, Entity as EventEntity};
use crate::domain::{CalendarEvent, TimeWindow};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn create(&self, event: CalendarEvent) -> AppResult<CalendarEvent>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CalendarEvent>>;

    /// Events of `owner_id` overlapping `window`, ordered by start
    async fn list(
        &self,
        tenant_id: Uuid,
        owner_id: Uuid,
        window: TimeWindow,
    ) -> AppResult<Vec<CalendarEvent>>;

    async fn update(&self, event: CalendarEvent) -> AppResult<CalendarEvent>;

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;
}

pub struct CalendarStore {
    db: DatabaseConnection,
}

impl CalendarStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(event: CalendarEvent) -> ActiveModel {
    ActiveModel {
        id: Set(event.id),
        tenant_id: Set(event.tenant_id),
        owner_id: Set(event.owner_id),
        title: Set(event.title),
        description: Set(event.description),
        location: Set(event.location),
        starts_at: Set(event.starts_at),
        ends_at: Set(event.ends_at),
        all_day: Set(event.all_day),
        remind_before_minutes: Set(event.remind_before_minutes),
        created_at: Set(event.created_at),
        updated_at: Set(event.updated_at),
    }
}

#[async_trait]
impl CalendarRepository for CalendarStore {
    async fn create(&self, event: CalendarEvent) -> AppResult<CalendarEvent> {
        let model = to_active(event)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(CalendarEvent::from(model))
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CalendarEvent>> {
        let result = EventEntity::find_by_id(id)
            .filter(calendar_event::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(CalendarEvent::from))
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        owner_id: Uuid,
        window: TimeWindow,
    ) -> AppResult<Vec<CalendarEvent>> {
        let mut query = EventEntity::find()
            .filter(calendar_event::Column::TenantId.eq(tenant_id))
            .filter(calendar_event::Column::OwnerId.eq(owner_id));

        // overlap: ends after the window opens and starts before it closes
        if let Some(from) = window.from {
            query = query.filter(calendar_event::Column::EndsAt.gte(from));
        }
        if let Some(to) = window.to {
            query = query.filter(calendar_event::Column::StartsAt.lte(to));
        }

        let models = query
            .order_by_asc(calendar_event::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(CalendarEvent::from).collect())
    }

    async fn update(&self, event: CalendarEvent) -> AppResult<CalendarEvent> {
        let model = to_active(event)
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(CalendarEvent::from(model))
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = EventEntity::delete_many()
            .filter(calendar_event::Column::Id.eq(id))
            .filter(calendar_event::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
