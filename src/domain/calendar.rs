//! Calendar events.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_EVENT_TITLE_LENGTH, MAX_REMINDER_MINUTES};
use crate::errors::{AppError, AppResult};

/// Calendar event owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "Quarterly planning")]
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    /// Minutes before `starts_at` at which a reminder fires
    pub remind_before_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// When the reminder should fire, if one is configured.
    pub fn reminder_at(&self) -> Option<DateTime<Utc>> {
        self.remind_before_minutes
            .map(|minutes| self.starts_at - Duration::minutes(i64::from(minutes)))
    }
}

/// Fields for a new event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub remind_before_minutes: Option<i32>,
}

impl NewEvent {
    pub fn validate(&self) -> AppResult<()> {
        validate_title(&self.title)?;
        validate_range(self.starts_at, self.ends_at)?;
        validate_reminder(self.remind_before_minutes)
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub remind_before_minutes: Option<Option<i32>>,
}

impl EventChanges {
    /// Apply onto a copy of `event`, validating the result as a whole.
    pub fn apply(&self, event: &CalendarEvent) -> AppResult<CalendarEvent> {
        let mut updated = event.clone();
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(location) = &self.location {
            updated.location = location.clone();
        }
        if let Some(starts_at) = self.starts_at {
            updated.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            updated.ends_at = ends_at;
        }
        if let Some(all_day) = self.all_day {
            updated.all_day = all_day;
        }
        if let Some(remind) = self.remind_before_minutes {
            updated.remind_before_minutes = remind;
        }

        validate_title(&updated.title)?;
        validate_range(updated.starts_at, updated.ends_at)?;
        validate_reminder(updated.remind_before_minutes)?;
        updated.updated_at = Utc::now();
        Ok(updated)
    }

    /// True if the reminder schedule may have moved.
    pub fn touches_schedule(&self) -> bool {
        self.starts_at.is_some() || self.remind_before_minutes.is_some()
    }
}

/// Optional time window for listing; an event matches when it overlaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn validate(&self) -> AppResult<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if to < from => {
                Err(AppError::validation("'to' must not be before 'from'"))
            }
            _ => Ok(()),
        }
    }

    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ends_at >= from) && self.to.map_or(true, |to| starts_at <= to)
    }
}

fn validate_title(title: &str) -> AppResult<()> {
    let length = title.trim().chars().count();
    if length == 0 || length > MAX_EVENT_TITLE_LENGTH as usize {
        return Err(AppError::validation(format!(
            "Title must be between 1 and {} characters",
            MAX_EVENT_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_range(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> AppResult<()> {
    if ends_at < starts_at {
        return Err(AppError::validation("Event cannot end before it starts"));
    }
    Ok(())
}

fn validate_reminder(minutes: Option<i32>) -> AppResult<()> {
    match minutes {
        Some(m) if !(0..=MAX_REMINDER_MINUTES).contains(&m) => Err(AppError::validation(format!(
            "Reminder must be between 0 and {} minutes",
            MAX_REMINDER_MINUTES
        ))),
        _ => Ok(()),
    }
}
