//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_tenants_and_users;
mod m20240102_000001_create_org_units;
mod m20240103_000001_create_workspace;
mod m20240104_000001_create_communication;
mod m20240105_000001_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tenants_and_users::Migration),
            Box::new(m20240102_000001_create_org_units::Migration),
            Box::new(m20240103_000001_create_workspace::Migration),
            Box::new(m20240104_000001_create_communication::Migration),
            Box::new(m20240105_000001_create_notifications::Migration),
        ]
    }
}
