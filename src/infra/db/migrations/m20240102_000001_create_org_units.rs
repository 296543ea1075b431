//! Migration: Org units, memberships, permission grants and communication links.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_tenants_and_users::{Tenants, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Units::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Units::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Units::Name).string().not_null())
                    .col(ColumnDef::new(Units::ParentId).uuid().null())
                    .col(
                        ColumnDef::new(Units::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Units::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_units_tenant")
                            .from(Units::Table, Units::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // children block deletion of their parent
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_units_parent")
                            .from(Units::Table, Units::ParentId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .check(Expr::col(Units::ParentId).ne(Expr::col(Units::Id)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_units_tenant_parent")
                    .table(Units::Table)
                    .col(Units::TenantId)
                    .col(Units::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UnitMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UnitMembers::UnitId).uuid().not_null())
                    .col(ColumnDef::new(UnitMembers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UnitMembers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UnitMembers::UnitId)
                            .col(UnitMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unit_members_unit")
                            .from(UnitMembers::Table, UnitMembers::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unit_members_user")
                            .from(UnitMembers::Table, UnitMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_unit_members_user")
                    .table(UnitMembers::Table)
                    .col(UnitMembers::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UnitPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UnitPermissions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UnitPermissions::UnitId).uuid().not_null())
                    .col(ColumnDef::new(UnitPermissions::Permission).string().not_null())
                    .col(
                        ColumnDef::new(UnitPermissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unit_permissions_unit")
                            .from(UnitPermissions::Table, UnitPermissions::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_unit_permissions_unit_permission")
                    .table(UnitPermissions::Table)
                    .col(UnitPermissions::UnitId)
                    .col(UnitPermissions::Permission)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommunicationLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommunicationLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommunicationLinks::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(CommunicationLinks::SourceUnitId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunicationLinks::TargetUnitId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunicationLinks::Bidirectional)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CommunicationLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_communication_links_tenant")
                            .from(CommunicationLinks::Table, CommunicationLinks::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_communication_links_source")
                            .from(CommunicationLinks::Table, CommunicationLinks::SourceUnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_communication_links_target")
                            .from(CommunicationLinks::Table, CommunicationLinks::TargetUnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(CommunicationLinks::SourceUnitId)
                            .ne(Expr::col(CommunicationLinks::TargetUnitId)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_communication_links_source_target")
                    .table(CommunicationLinks::Table)
                    .col(CommunicationLinks::SourceUnitId)
                    .col(CommunicationLinks::TargetUnitId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommunicationLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UnitPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UnitMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Units {
    Table,
    Id,
    TenantId,
    Name,
    ParentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum UnitMembers {
    Table,
    UnitId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum UnitPermissions {
    Table,
    Id,
    UnitId,
    Permission,
    CreatedAt,
}

#[derive(Iden)]
enum CommunicationLinks {
    Table,
    Id,
    TenantId,
    SourceUnitId,
    TargetUnitId,
    Bidirectional,
    CreatedAt,
}
