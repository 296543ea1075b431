//! Commands module - CLI command implementations.
//!
//! Each command is implemented in its own module for separation of concerns.

pub mod jobs;
pub mod migrate;
pub mod serve;

use apalis_sql::sqlx::postgres::PgPoolOptions;
use apalis_sql::sqlx::PgPool;

use crate::config::{Config, JOB_POOL_MAX_CONNECTIONS};
use crate::errors::{AppError, AppResult};

/// Pool for the apalis job tables; sea-orm keeps its own pool.
pub(crate) async fn job_pool(config: &Config) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(JOB_POOL_MAX_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect job storage: {}", e)))
}
