//! Calendar service - personal events with optional reminders.
//!
//! Events belong to their owner. Holders of `calendar.share` may read the
//! calendars of users they can reach. Reminders are queued as background
//! jobs; jobs left behind by a reschedule are discarded by the worker.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use crate::domain::{Actor, CalendarEvent, EventChanges, NewEvent, Permission, TimeWindow};
use crate::errors::{AppError, AppResult};
use crate::infra::{ReminderQueue, UnitOfWork};
use crate::jobs::ReminderJob;

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn create_event(&self, actor: &Actor, event: NewEvent) -> AppResult<CalendarEvent>;
    async fn get_event(&self, actor: &Actor, id: Uuid) -> AppResult<CalendarEvent>;
    /// Events overlapping `window`; `owner_id` defaults to the caller
    async fn list_events(
        &self,
        actor: &Actor,
        owner_id: Option<Uuid>,
        window: TimeWindow,
    ) -> AppResult<Vec<CalendarEvent>>;
    async fn update_event(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: EventChanges,
    ) -> AppResult<CalendarEvent>;
    async fn delete_event(&self, actor: &Actor, id: Uuid) -> AppResult<()>;
}

pub struct CalendarManager<U: UnitOfWork> {
    uow: Arc<U>,
    reminders: Arc<dyn ReminderQueue>,
}

impl<U: UnitOfWork> CalendarManager<U> {
    pub fn new(uow: Arc<U>, reminders: Arc<dyn ReminderQueue>) -> Self {
        Self { uow, reminders }
    }

    async fn owned_event(&self, actor: &Actor, id: Uuid) -> AppResult<CalendarEvent> {
        let event = self
            .uow
            .calendar()
            .find(actor.tenant_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if event.owner_id != actor.user_id {
            // other users' events are invisible, not forbidden
            return Err(AppError::NotFound);
        }
        Ok(event)
    }

    /// Queue the reminder for `event` if it still lies ahead.
    ///
    /// The event is already stored, so a queue failure is logged rather
    /// than failing the request.
    async fn schedule_reminder(&self, event: &CalendarEvent) {
        let Some(job) = ReminderJob::for_event(event) else {
            return;
        };
        if event.starts_at <= Utc::now() {
            return;
        }

        let run_at = job.remind_at;
        if let Err(e) = self.reminders.schedule(job, run_at).await {
            tracing::error!(event_id = %event.id, error = %e, "Failed to schedule reminder");
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> CalendarService for CalendarManager<U> {
    async fn create_event(&self, actor: &Actor, event: NewEvent) -> AppResult<CalendarEvent> {
        event.validate()?;

        let now = Utc::now();
        let created = self
            .uow
            .calendar()
            .create(CalendarEvent {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                owner_id: actor.user_id,
                title: event.title.trim().to_string(),
                description: event.description,
                location: event.location,
                starts_at: event.starts_at,
                ends_at: event.ends_at,
                all_day: event.all_day,
                remind_before_minutes: event.remind_before_minutes,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.schedule_reminder(&created).await;
        tracing::debug!(event_id = %created.id, "Calendar event created");
        Ok(created)
    }

    async fn get_event(&self, actor: &Actor, id: Uuid) -> AppResult<CalendarEvent> {
        self.owned_event(actor, id).await
    }

    async fn list_events(
        &self,
        actor: &Actor,
        owner_id: Option<Uuid>,
        window: TimeWindow,
    ) -> AppResult<Vec<CalendarEvent>> {
        window.validate()?;
        let owner_id = owner_id.unwrap_or(actor.user_id);

        if owner_id != actor.user_id {
            access::require_permission(self.uow.as_ref(), actor, Permission::CalendarShare)
                .await?;
            access::require_reachable(self.uow.as_ref(), actor, owner_id).await?;
        }

        self.uow
            .calendar()
            .list(actor.tenant_id, owner_id, window)
            .await
    }

    async fn update_event(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: EventChanges,
    ) -> AppResult<CalendarEvent> {
        let current = self.owned_event(actor, id).await?;
        let mut updated = changes.apply(&current)?;
        updated.title = updated.title.trim().to_string();

        let saved = self.uow.calendar().update(updated).await?;
        if changes.touches_schedule() {
            self.schedule_reminder(&saved).await;
        }
        Ok(saved)
    }

    async fn delete_event(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.owned_event(actor, id).await?;
        self.uow.calendar().delete(actor.tenant_id, id).await
    }
}
