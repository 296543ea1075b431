//! Jobs command - Reminder queue management.
//!
//! - `work`: run the reminder worker process
//! - `list`: show queued reminders by status
//! - `clear`: remove failed reminders from the queue
//!
//! ## Usage
//!
//! ```bash
//! officehub jobs work
//! officehub jobs list
//! officehub jobs clear
//! ```

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use std::sync::Arc;

use crate::cli::args::{JobsAction, JobsArgs};
use crate::config::{Config, JOB_NAME_REMINDER};
use crate::errors::{AppError, AppResult};
use crate::infra::{reminder_storage, Database, Persistence};

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: Config) -> AppResult<()> {
    match args.action {
        JobsAction::Work => run_worker(&config).await,
        JobsAction::List => list_jobs(&config).await,
        JobsAction::Clear => clear_failed_jobs(&config).await,
    }
}

/// Start the reminder worker.
///
/// Reminders become inbox notifications; connected clients see them the
/// next time they read their inbox.
async fn run_worker(config: &Config) -> AppResult<()> {
    use apalis::prelude::*;

    use crate::jobs::reminder_job_handler;

    tracing::info!("Connecting to database for job worker...");

    let db = Database::connect_without_migrations(config)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;
    let persistence = Arc::new(Persistence::new(db.get_connection()));

    let pool = super::job_pool(config).await?;
    let storage = reminder_storage(pool).await?;

    tracing::info!("Reminder worker started. Press Ctrl+C to stop.");

    let worker = WorkerBuilder::new("reminder-worker")
        .data(persistence)
        .backend(storage)
        .build_fn(reminder_job_handler);

    let monitor = Monitor::new().register(worker);

    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                tracing::error!("Worker error: {}", e);
                return Err(AppError::internal(format!("Worker failed: {}", e)));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping worker...");
        }
    }

    tracing::info!("Job worker stopped.");
    Ok(())
}

fn statement(sql: &str, values: Vec<sea_orm::Value>) -> Statement {
    Statement::from_sql_and_values(DatabaseBackend::Postgres, sql, values)
}

/// Connect and check that the apalis tables exist yet.
async fn queue_connection(config: &Config) -> AppResult<Option<DatabaseConnection>> {
    tracing::info!("Connecting to database...");

    let db = Database::connect_without_migrations(config)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;
    let db = db.get_connection();

    let row = db
        .query_one(statement(
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = 'apalis') AS exists",
            vec![],
        ))
        .await?;

    let exists = row
        .and_then(|r| r.try_get::<bool>("", "exists").ok())
        .unwrap_or(false);

    Ok(exists.then_some(db))
}

/// Per-status counts for the reminder queue
#[derive(Debug, Default, PartialEq, Eq)]
struct QueueCounts {
    pending: i64,
    running: i64,
    failed: i64,
    done: i64,
    killed: i64,
}

impl QueueCounts {
    fn record(&mut self, status: &str, count: i64) {
        match status {
            "Pending" => self.pending = count,
            "Running" => self.running = count,
            "Failed" => self.failed = count,
            "Done" => self.done = count,
            "Killed" => self.killed = count,
            other => tracing::debug!(status = %other, "Unknown job status"),
        }
    }
}

/// List queued reminders by status
async fn list_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = queue_connection(config).await? else {
        println!("\n=== Reminder Queue ===");
        println!("Job queue not initialized.");
        println!("Run 'jobs work' or 'serve' first to create the queue tables.");
        println!("======================\n");
        return Ok(());
    };

    let rows = db
        .query_all(statement(
            "SELECT status::text AS status, COUNT(*)::bigint AS count FROM apalis.jobs WHERE job_type = $1 GROUP BY status",
            vec![JOB_NAME_REMINDER.into()],
        ))
        .await?;

    let mut counts = QueueCounts::default();
    for row in rows {
        if let (Ok(status), Ok(count)) = (
            row.try_get::<String>("", "status"),
            row.try_get::<i64>("", "count"),
        ) {
            counts.record(&status, count);
        }
    }

    println!("\n=== Reminder Queue ===");
    println!("Pending:  {}", counts.pending);
    println!("Running:  {}", counts.running);
    println!("Failed:   {}", counts.failed);
    println!("Killed:   {}", counts.killed);
    println!("Done:     {}", counts.done);
    println!("======================\n");

    Ok(())
}

/// Clear failed reminders from the queue
async fn clear_failed_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = queue_connection(config).await? else {
        println!("Job queue not initialized. Nothing to clear.");
        return Ok(());
    };

    let result = db
        .execute(statement(
            "DELETE FROM apalis.jobs WHERE job_type = $1 AND status IN ('Failed', 'Killed')",
            vec![JOB_NAME_REMINDER.into()],
        ))
        .await?;

    println!(
        "Cleared {} failed reminder job(s) from the queue.",
        result.rows_affected()
    );
    Ok(())
}
