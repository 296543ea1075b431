//! Producer side of the background job queue.

use apalis::prelude::Storage;
use apalis_sql::postgres::PostgresStorage;
use apalis_sql::sqlx::PgPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::JOB_NAME_REMINDER;
use crate::errors::{AppError, AppResult};
use crate::jobs::ReminderJob;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Schedules calendar reminders.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReminderQueue: Send + Sync {
    /// Enqueue `job` to run at `run_at`. Past times run immediately.
    async fn schedule(&self, job: ReminderJob, run_at: DateTime<Utc>) -> AppResult<()>;
}

/// Open the reminder storage, creating the apalis tables if needed.
pub async fn reminder_storage(pool: PgPool) -> AppResult<PostgresStorage<ReminderJob>> {
    PostgresStorage::setup(&pool)
        .await
        .map_err(|e| AppError::internal(format!("Failed to setup job storage: {}", e)))?;

    let config = apalis_sql::Config::new(JOB_NAME_REMINDER);
    Ok(PostgresStorage::new_with_config(pool, config))
}

/// apalis-backed queue shared by the API server.
#[derive(Clone)]
pub struct JobQueue {
    reminders: PostgresStorage<ReminderJob>,
}

impl JobQueue {
    pub fn new(reminders: PostgresStorage<ReminderJob>) -> Self {
        Self { reminders }
    }
}

#[async_trait]
impl ReminderQueue for JobQueue {
    async fn schedule(&self, job: ReminderJob, run_at: DateTime<Utc>) -> AppResult<()> {
        let event_id = job.event_id;
        let mut storage = self.reminders.clone();
        storage
            .schedule(job, run_at.timestamp())
            .await
            .map_err(|e| AppError::internal(format!("Failed to enqueue reminder: {}", e)))?;

        tracing::debug!(event_id = %event_id, run_at = %run_at, "Reminder scheduled");
        Ok(())
    }
}
