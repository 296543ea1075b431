//! Conversation and message repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::fetch_page;
use super::entities::{chat_message, conversation, conversation_participant as participant};
use crate::domain::{ChatMessage, Conversation, ConversationDetails, Participant};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a conversation together with its participants
    async fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: Vec<Uuid>,
    ) -> AppResult<ConversationDetails>;

    async fn find_conversation(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Conversation>>;

    /// Untitled two-person conversation between `a` and `b`, if any
    async fn find_direct(&self, tenant_id: Uuid, a: Uuid, b: Uuid) -> AppResult<Option<Conversation>>;

    /// Conversations `user_id` takes part in, latest activity first
    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<Conversation>>;

    async fn participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>>;

    /// Remove a participant; the conversation is deleted once empty.
    /// Returns false if the user was not a participant.
    async fn remove_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Insert a message and bump the conversation's activity time
    async fn insert_message(&self, message: ChatMessage) -> AppResult<ChatMessage>;

    async fn find_message(&self, conversation_id: Uuid, id: Uuid) -> AppResult<Option<ChatMessage>>;

    async fn update_message(&self, message: ChatMessage) -> AppResult<ChatMessage>;

    /// Page of messages, newest first
    async fn history(
        &self,
        conversation_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<(Vec<ChatMessage>, u64)>;
}

pub struct ChatStore {
    db: DatabaseConnection,
}

impl ChatStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn conversations_of(user_id: Uuid) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(participant::Column::ConversationId)
        .from(participant::Entity)
        .and_where(participant::Column::UserId.eq(user_id))
        .to_owned()
}

fn message_active(message: ChatMessage) -> chat_message::ActiveModel {
    chat_message::ActiveModel {
        id: Set(message.id),
        conversation_id: Set(message.conversation_id),
        sender_id: Set(message.sender_id),
        body: Set(message.body),
        created_at: Set(message.created_at),
        edited_at: Set(message.edited_at),
        deleted_at: Set(message.deleted_at),
    }
}

#[async_trait]
impl ChatRepository for ChatStore {
    async fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: Vec<Uuid>,
    ) -> AppResult<ConversationDetails> {
        let txn = self.db.begin().await?;

        let model = conversation::ActiveModel {
            id: Set(conversation.id),
            tenant_id: Set(conversation.tenant_id),
            title: Set(conversation.title),
            is_group: Set(conversation.is_group),
            created_by: Set(conversation.created_by),
            created_at: Set(conversation.created_at),
            updated_at: Set(conversation.updated_at),
        }
        .insert(&txn)
        .await?;

        let rows = participant_ids.iter().map(|&user_id| participant::ActiveModel {
            conversation_id: Set(model.id),
            user_id: Set(user_id),
            joined_at: Set(model.created_at),
            last_read_at: Set(None),
        });
        participant::Entity::insert_many(rows).exec(&txn).await?;

        txn.commit().await?;

        Ok(ConversationDetails {
            conversation: Conversation::from(model),
            participant_ids,
        })
    }

    async fn find_conversation(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Conversation>> {
        let result = conversation::Entity::find_by_id(id)
            .filter(conversation::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Conversation::from))
    }

    async fn find_direct(&self, tenant_id: Uuid, a: Uuid, b: Uuid) -> AppResult<Option<Conversation>> {
        let candidates = conversation::Entity::find()
            .filter(conversation::Column::TenantId.eq(tenant_id))
            .filter(conversation::Column::IsGroup.eq(false))
            .filter(conversation::Column::Title.is_null())
            .filter(conversation::Column::Id.in_subquery(conversations_of(a)))
            .filter(conversation::Column::Id.in_subquery(conversations_of(b)))
            .all(&self.db)
            .await?;

        for candidate in candidates {
            let count = participant::Entity::find()
                .filter(participant::Column::ConversationId.eq(candidate.id))
                .count(&self.db)
                .await?;
            if count == 2 {
                return Ok(Some(Conversation::from(candidate)));
            }
        }
        Ok(None)
    }

    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let models = conversation::Entity::find()
            .filter(conversation::Column::TenantId.eq(tenant_id))
            .filter(conversation::Column::Id.in_subquery(conversations_of(user_id)))
            .order_by_desc(conversation::Column::UpdatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Conversation::from).collect())
    }

    async fn participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>> {
        let models = participant::Entity::find()
            .filter(participant::Column::ConversationId.eq(conversation_id))
            .order_by_asc(participant::Column::JoinedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Participant::from).collect())
    }

    async fn remove_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        let removed = participant::Entity::delete_by_id((conversation_id, user_id))
            .exec(&txn)
            .await?
            .rows_affected
            > 0;

        let remaining = participant::Entity::find()
            .filter(participant::Column::ConversationId.eq(conversation_id))
            .count(&txn)
            .await?;
        if remaining == 0 {
            conversation::Entity::delete_by_id(conversation_id)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(removed)
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        participant::Entity::update_many()
            .col_expr(participant::Column::LastReadAt, Expr::value(at))
            .filter(participant::Column::ConversationId.eq(conversation_id))
            .filter(participant::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn insert_message(&self, message: ChatMessage) -> AppResult<ChatMessage> {
        let txn = self.db.begin().await?;

        let model = message_active(message).insert(&txn).await?;
        conversation::Entity::update_many()
            .col_expr(conversation::Column::UpdatedAt, Expr::value(model.created_at))
            .filter(conversation::Column::Id.eq(model.conversation_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(ChatMessage::from(model))
    }

    async fn find_message(&self, conversation_id: Uuid, id: Uuid) -> AppResult<Option<ChatMessage>> {
        let result = chat_message::Entity::find_by_id(id)
            .filter(chat_message::Column::ConversationId.eq(conversation_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(ChatMessage::from))
    }

    async fn update_message(&self, message: ChatMessage) -> AppResult<ChatMessage> {
        let model = message_active(message)
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(ChatMessage::from(model))
    }

    async fn history(
        &self,
        conversation_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<(Vec<ChatMessage>, u64)> {
        let select = chat_message::Entity::find()
            .filter(chat_message::Column::ConversationId.eq(conversation_id))
            .order_by_desc(chat_message::Column::CreatedAt);

        let (models, total) = fetch_page(select, &self.db, params).await?;
        Ok((models.into_iter().map(ChatMessage::from).collect(), total))
    }
}
