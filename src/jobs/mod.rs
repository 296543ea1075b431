//! Background jobs processed by `officehub jobs work`.

pub mod reminder_job;

pub use reminder_job::{deliver_reminder, reminder_job_handler, ReminderJob};
