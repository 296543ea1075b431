//! Migrate command - Database migration management.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    // no auto-migration here; the action decides
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => {
            tracing::info!("Running pending migrations...");
            db.run_migrations().await?;
            tracing::info!("Migrations completed successfully");
        }
        MigrateAction::Down => {
            tracing::info!("Rolling back last migration...");
            db.rollback_migration().await?;
            tracing::info!("Rollback completed successfully");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            print!("{}", render_status(&status));
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all tables and re-running every migration...");
            db.fresh_migrations().await?;
            tracing::info!("Fresh migrations completed successfully");
        }
    }

    Ok(())
}

/// One line per migration plus a pending summary.
fn render_status(status: &[(String, bool)]) -> String {
    let mut out = String::new();
    for (name, applied) in status {
        let state = if *applied { "applied" } else { "pending" };
        out.push_str(&format!("{:<8} {}\n", state, name));
    }
    let pending = status.iter().filter(|(_, applied)| !applied).count();
    out.push_str(&format!("{} migration(s), {} pending\n", status.len(), pending));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_status() {
        let status = vec![
            ("m20240101_000001_create_tenants".to_string(), true),
            ("m20240101_000002_create_units".to_string(), false),
        ];
        let out = render_status(&status);
        assert!(out.contains("applied  m20240101_000001_create_tenants"));
        assert!(out.contains("pending  m20240101_000002_create_units"));
        assert!(out.ends_with("2 migration(s), 1 pending\n"));
    }
}
