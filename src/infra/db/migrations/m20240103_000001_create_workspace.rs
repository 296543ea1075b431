//! Migration: Calendar events, spreadsheets and code documents.

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
                    .table(CalendarEvents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CalendarEvents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CalendarEvents::TenantId).uuid().not_null())
                    .col(ColumnDef::new(CalendarEvents::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(CalendarEvents::Title).string_len(200).not_null())
                    .col(ColumnDef::new(CalendarEvents::Description).text().null())
                    .col(ColumnDef::new(CalendarEvents::Location).string().null())
                    .col(
                        ColumnDef::new(CalendarEvents::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalendarEvents::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalendarEvents::AllDay)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CalendarEvents::RemindBeforeMinutes).integer().null())
                    .col(
                        ColumnDef::new(CalendarEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalendarEvents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_calendar_events_tenant")
                            .from(CalendarEvents::Table, CalendarEvents::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_calendar_events_owner")
                            .from(CalendarEvents::Table, CalendarEvents::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(CalendarEvents::EndsAt).gte(Expr::col(CalendarEvents::StartsAt)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_calendar_events_owner_range")
                    .table(CalendarEvents::Table)
                    .col(CalendarEvents::OwnerId)
                    .col(CalendarEvents::StartsAt)
                    .col(CalendarEvents::EndsAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Spreadsheets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Spreadsheets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Spreadsheets::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Spreadsheets::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Spreadsheets::Name).string().not_null())
                    .col(ColumnDef::new(Spreadsheets::Rows).integer().not_null())
                    .col(ColumnDef::new(Spreadsheets::Cols).integer().not_null())
                    .col(ColumnDef::new(Spreadsheets::Cells).json_binary().not_null())
                    .col(
                        ColumnDef::new(Spreadsheets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Spreadsheets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spreadsheets_tenant")
                            .from(Spreadsheets::Table, Spreadsheets::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spreadsheets_owner")
                            .from(Spreadsheets::Table, Spreadsheets::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(Spreadsheets::Rows).gt(0))
                    .check(Expr::col(Spreadsheets::Cols).gt(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_spreadsheets_tenant_owner")
                    .table(Spreadsheets::Table)
                    .col(Spreadsheets::TenantId)
                    .col(Spreadsheets::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CodeDocuments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CodeDocuments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CodeDocuments::TenantId).uuid().not_null())
                    .col(ColumnDef::new(CodeDocuments::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(CodeDocuments::Name).string().not_null())
                    .col(ColumnDef::new(CodeDocuments::Language).string_len(32).not_null())
                    .col(ColumnDef::new(CodeDocuments::Content).text().not_null())
                    .col(
                        ColumnDef::new(CodeDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CodeDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_code_documents_tenant")
                            .from(CodeDocuments::Table, CodeDocuments::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_code_documents_owner")
                            .from(CodeDocuments::Table, CodeDocuments::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_code_documents_tenant_owner")
                    .table(CodeDocuments::Table)
                    .col(CodeDocuments::TenantId)
                    .col(CodeDocuments::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CodeDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Spreadsheets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CalendarEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CalendarEvents {
    Table,
    Id,
    TenantId,
    OwnerId,
    Title,
    Description,
    Location,
    StartsAt,
    EndsAt,
    AllDay,
    RemindBeforeMinutes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Spreadsheets {
    Table,
    Id,
    TenantId,
    OwnerId,
    Name,
    Rows,
    Cols,
    Cells,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CodeDocuments {
    Table,
    Id,
    TenantId,
    OwnerId,
    Name,
    Language,
    Content,
    CreatedAt,
    UpdatedAt,
}
