//! Calendar reminder background job.
//!
//! Queued by the calendar service when an event carries
//! `remind_before_minutes`; the worker stores a `calendar.reminder`
//! notification for the owner. Connected clients pick it up from the
//! notification inbox since the worker runs in its own process.

use apalis::prelude::Data;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{kinds, CalendarEvent, Notification};
use crate::errors::{AppError, AppResult};
use crate::infra::{Persistence, UnitOfWork};

/// Reminder job payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    /// Fire time the job was queued for
    pub remind_at: DateTime<Utc>,
}

impl ReminderJob {
    /// Job for the event's configured reminder, if any.
    pub fn for_event(event: &CalendarEvent) -> Option<Self> {
        let remind_at = event.reminder_at()?;
        Some(Self {
            tenant_id: event.tenant_id,
            user_id: event.owner_id,
            event_id: event.id,
            title: event.title.clone(),
            starts_at: event.starts_at,
            remind_at,
        })
    }

    /// A job goes stale when the event was moved or its reminder changed
    /// or removed after scheduling.
    pub fn is_current(&self, event: &CalendarEvent) -> bool {
        event.owner_id == self.user_id
            && event.starts_at == self.starts_at
            && event.reminder_at() == Some(self.remind_at)
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "event_id": self.event_id,
            "title": self.title,
            "starts_at": self.starts_at,
        })
    }
}

/// Store the reminder notification unless the job is stale.
///
/// Returns the stored notification, or `None` when skipped.
pub async fn deliver_reminder<U: UnitOfWork + ?Sized>(
    uow: &U,
    job: &ReminderJob,
) -> AppResult<Option<Notification>> {
    let event = uow.calendar().find(job.tenant_id, job.event_id).await?;

    match event {
        Some(event) if job.is_current(&event) => {
            let notification = Notification::new(
                job.tenant_id,
                job.user_id,
                kinds::CALENDAR_REMINDER,
                job.payload(),
            );
            let stored = uow.notifications().create(notification).await?;
            Ok(Some(stored))
        }
        Some(_) => {
            tracing::debug!(event_id = %job.event_id, "Skipping stale reminder");
            Ok(None)
        }
        None => {
            tracing::debug!(event_id = %job.event_id, "Event deleted, dropping reminder");
            Ok(None)
        }
    }
}

/// Reminder job handler - processes queued calendar reminders
pub async fn reminder_job_handler(
    job: ReminderJob,
    uow: Data<Arc<Persistence>>,
) -> Result<(), AppError> {
    tracing::info!(
        event_id = %job.event_id,
        user_id = %job.user_id,
        "Processing reminder job"
    );

    let persistence: &Persistence = &uow;
    if let Some(notification) = deliver_reminder(persistence, &job).await? {
        tracing::info!(notification_id = %notification.id, "Reminder delivered");
    }
    Ok(())
}
