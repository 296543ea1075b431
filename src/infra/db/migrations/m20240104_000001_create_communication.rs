//! Migration: Conversations, messages, phone calls and remote sessions.

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
                    .table(Conversations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Conversations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Conversations::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Conversations::Title).string().null())
                    .col(ColumnDef::new(Conversations::IsGroup).boolean().not_null())
                    .col(ColumnDef::new(Conversations::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Conversations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversations_tenant")
                            .from(Conversations::Table, Conversations::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConversationParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConversationParticipants::ConversationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConversationParticipants::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ConversationParticipants::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConversationParticipants::LastReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ConversationParticipants::ConversationId)
                            .col(ConversationParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_participants_conversation")
                            .from(
                                ConversationParticipants::Table,
                                ConversationParticipants::ConversationId,
                            )
                            .to(Conversations::Table, Conversations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_participants_user")
                            .from(
                                ConversationParticipants::Table,
                                ConversationParticipants::UserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_participants_user")
                    .table(ConversationParticipants::Table)
                    .col(ConversationParticipants::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatMessages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ChatMessages::ConversationId).uuid().not_null())
                    .col(ColumnDef::new(ChatMessages::SenderId).uuid().not_null())
                    .col(ColumnDef::new(ChatMessages::Body).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChatMessages::EditedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(ChatMessages::DeletedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_messages_conversation")
                            .from(ChatMessages::Table, ChatMessages::ConversationId)
                            .to(Conversations::Table, Conversations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_messages_sender")
                            .from(ChatMessages::Table, ChatMessages::SenderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_messages_conversation_created")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::ConversationId)
                    .col(ChatMessages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PhoneCalls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PhoneCalls::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PhoneCalls::TenantId).uuid().not_null())
                    .col(ColumnDef::new(PhoneCalls::CallerId).uuid().not_null())
                    .col(ColumnDef::new(PhoneCalls::CalleeId).uuid().not_null())
                    .col(ColumnDef::new(PhoneCalls::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(PhoneCalls::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PhoneCalls::AnsweredAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(PhoneCalls::EndedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phone_calls_tenant")
                            .from(PhoneCalls::Table, PhoneCalls::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(PhoneCalls::CallerId).ne(Expr::col(PhoneCalls::CalleeId)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_phone_calls_callee_status")
                    .table(PhoneCalls::Table)
                    .col(PhoneCalls::CalleeId)
                    .col(PhoneCalls::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_phone_calls_caller_status")
                    .table(PhoneCalls::Table)
                    .col(PhoneCalls::CallerId)
                    .col(PhoneCalls::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RemoteSessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RemoteSessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(RemoteSessions::TenantId).uuid().not_null())
                    .col(ColumnDef::new(RemoteSessions::HostId).uuid().not_null())
                    .col(ColumnDef::new(RemoteSessions::ControllerId).uuid().not_null())
                    .col(ColumnDef::new(RemoteSessions::Status).string_len(16).not_null())
                    .col(ColumnDef::new(RemoteSessions::ScreenWidth).integer().null())
                    .col(ColumnDef::new(RemoteSessions::ScreenHeight).integer().null())
                    .col(
                        ColumnDef::new(RemoteSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemoteSessions::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(RemoteSessions::EndedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_remote_sessions_tenant")
                            .from(RemoteSessions::Table, RemoteSessions::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(RemoteSessions::HostId).ne(Expr::col(RemoteSessions::ControllerId)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_remote_sessions_host")
                    .table(RemoteSessions::Table)
                    .col(RemoteSessions::HostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_remote_sessions_controller")
                    .table(RemoteSessions::Table)
                    .col(RemoteSessions::ControllerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RemoteSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PhoneCalls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ConversationParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Conversations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Conversations {
    Table,
    Id,
    TenantId,
    Title,
    IsGroup,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ConversationParticipants {
    Table,
    ConversationId,
    UserId,
    JoinedAt,
    LastReadAt,
}

#[derive(Iden)]
enum ChatMessages {
    Table,
    Id,
    ConversationId,
    SenderId,
    Body,
    CreatedAt,
    EditedAt,
    DeletedAt,
}

#[derive(Iden)]
enum PhoneCalls {
    Table,
    Id,
    TenantId,
    CallerId,
    CalleeId,
    Status,
    StartedAt,
    AnsweredAt,
    EndedAt,
}

#[derive(Iden)]
enum RemoteSessions {
    Table,
    Id,
    TenantId,
    HostId,
    ControllerId,
    Status,
    ScreenWidth,
    ScreenHeight,
    CreatedAt,
    StartedAt,
    EndedAt,
}
