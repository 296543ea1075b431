//! Messaging service - conversations, messages and read markers.
//!
//! Only participants see a conversation. Starting one requires that the
//! creator can reach every other participant through the org rules, unless
//! the creator holds `chat.broadcast`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use super::container::parallel;
use super::NotificationService;
use crate::domain::chat::{normalize_body, participant_set};
use crate::domain::{
    kinds, Actor, ChatMessage, Conversation, ConversationDetails, Participant, Permission,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};

/// Characters of the body carried in the push payload
const PREVIEW_LENGTH: usize = 80;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Start a conversation, reusing an existing direct one for the same pair
    async fn start_conversation(
        &self,
        actor: &Actor,
        participant_ids: Vec<Uuid>,
        title: Option<String>,
    ) -> AppResult<ConversationDetails>;
    async fn list_conversations(&self, actor: &Actor) -> AppResult<Vec<Conversation>>;
    async fn get_conversation(&self, actor: &Actor, id: Uuid) -> AppResult<ConversationDetails>;
    async fn leave_conversation(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    async fn send_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        body: String,
    ) -> AppResult<ChatMessage>;
    /// Messages newest first; deleted ones come back with an empty body
    async fn history(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<Paginated<ChatMessage>>;
    async fn edit_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        message_id: Uuid,
        body: String,
    ) -> AppResult<ChatMessage>;
    async fn delete_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()>;
    async fn mark_read(&self, actor: &Actor, conversation_id: Uuid) -> AppResult<()>;
}

pub struct ChatManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifications: Arc<dyn NotificationService>,
}

impl<U: UnitOfWork> ChatManager<U> {
    pub fn new(uow: Arc<U>, notifications: Arc<dyn NotificationService>) -> Self {
        Self { uow, notifications }
    }

    /// Load a conversation the actor takes part in. Non-participants get
    /// `NotFound` so conversation ids do not leak.
    async fn joined(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> AppResult<(Conversation, Vec<Participant>)> {
        let chat = self.uow.chat();
        let conversation = chat
            .find_conversation(actor.tenant_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let participants = chat.participants(id).await?;

        if !participants.iter().any(|p| p.user_id == actor.user_id) {
            return Err(AppError::NotFound);
        }
        Ok((conversation, participants))
    }

    async fn own_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<ChatMessage> {
        self.joined(actor, conversation_id).await?;
        let message = self
            .uow
            .chat()
            .find_message(conversation_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if message.sender_id != actor.user_id {
            return Err(AppError::Forbidden);
        }
        if message.deleted_at.is_some() {
            return Err(AppError::state_conflict("Message has been deleted"));
        }
        Ok(message)
    }

    /// Check that every participant exists and is reachable by the creator.
    async fn check_participants(&self, actor: &Actor, others: &[Uuid]) -> AppResult<()> {
        let users = self
            .uow
            .users()
            .find_many(actor.tenant_id, others.to_vec())
            .await?;
        if users.len() != others.len() {
            return Err(AppError::validation("Unknown participant"));
        }

        if access::has_permission(self.uow.as_ref(), actor, Permission::ChatBroadcast).await? {
            return Ok(());
        }

        let graph = access::load_graph(self.uow.as_ref(), actor.tenant_id).await?;
        match users.iter().find(|u| !access::reachable(&graph, actor, u)) {
            Some(blocked) => {
                tracing::debug!(
                    from = %actor.user_id,
                    to = %blocked.id,
                    "Conversation blocked by org rules"
                );
                Err(AppError::Forbidden)
            }
            None => Ok(()),
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_LENGTH).collect()
}

#[async_trait]
impl<U: UnitOfWork> ChatService for ChatManager<U> {
    async fn start_conversation(
        &self,
        actor: &Actor,
        participant_ids: Vec<Uuid>,
        title: Option<String>,
    ) -> AppResult<ConversationDetails> {
        let ids = participant_set(actor.user_id, &participant_ids)?;
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let others: Vec<Uuid> = ids
            .iter()
            .copied()
            .filter(|id| *id != actor.user_id)
            .collect();

        self.check_participants(actor, &others).await?;

        let chat = self.uow.chat();
        if ids.len() == 2 && title.is_none() {
            if let Some(existing) = chat.find_direct(actor.tenant_id, ids[0], ids[1]).await? {
                return Ok(ConversationDetails {
                    conversation: existing,
                    participant_ids: ids,
                });
            }
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id,
            is_group: ids.len() > 2 || title.is_some(),
            title,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
        };

        let details = chat.create_conversation(conversation, ids).await?;
        tracing::info!(
            conversation_id = %details.conversation.id,
            participants = details.participant_ids.len(),
            "Conversation started"
        );
        Ok(details)
    }

    async fn list_conversations(&self, actor: &Actor) -> AppResult<Vec<Conversation>> {
        self.uow
            .chat()
            .list_for_user(actor.tenant_id, actor.user_id)
            .await
    }

    async fn get_conversation(&self, actor: &Actor, id: Uuid) -> AppResult<ConversationDetails> {
        let (conversation, participants) = self.joined(actor, id).await?;
        Ok(ConversationDetails {
            conversation,
            participant_ids: participants.into_iter().map(|p| p.user_id).collect(),
        })
    }

    async fn leave_conversation(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.joined(actor, id).await?;
        self.uow.chat().remove_participant(id, actor.user_id).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        body: String,
    ) -> AppResult<ChatMessage> {
        let body = normalize_body(&body)?;
        let (_, participants) = self.joined(actor, conversation_id).await?;

        let message = self
            .uow
            .chat()
            .insert_message(ChatMessage {
                id: Uuid::new_v4(),
                conversation_id,
                sender_id: actor.user_id,
                body,
                created_at: Utc::now(),
                edited_at: None,
                deleted_at: None,
            })
            .await?;

        let payload = json!({
            "conversation_id": conversation_id,
            "message_id": message.id,
            "sender_id": actor.user_id,
            "preview": preview(&message.body),
        });
        let deliveries: Vec<_> = participants
            .iter()
            .filter(|p| p.user_id != actor.user_id)
            .map(|p| {
                self.notifications.notify(
                    actor.tenant_id,
                    p.user_id,
                    kinds::CHAT_MESSAGE,
                    payload.clone(),
                )
            })
            .collect();

        // the message is stored; a failed notification does not undo it
        if let Err(e) = parallel::join_all(deliveries).await {
            tracing::error!(message_id = %message.id, error = %e, "Failed to notify participants");
        }

        Ok(message)
    }

    async fn history(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<Paginated<ChatMessage>> {
        self.joined(actor, conversation_id).await?;
        let (messages, total) = self.uow.chat().history(conversation_id, params).await?;
        Ok(Paginated::from_params(messages, params, total).map(ChatMessage::redacted))
    }

    async fn edit_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        message_id: Uuid,
        body: String,
    ) -> AppResult<ChatMessage> {
        let body = normalize_body(&body)?;
        let mut message = self.own_message(actor, conversation_id, message_id).await?;
        message.body = body;
        message.edited_at = Some(Utc::now());
        self.uow.chat().update_message(message).await
    }

    async fn delete_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()> {
        let mut message = self.own_message(actor, conversation_id, message_id).await?;
        message.deleted_at = Some(Utc::now());
        self.uow.chat().update_message(message).await?;
        Ok(())
    }

    async fn mark_read(&self, actor: &Actor, conversation_id: Uuid) -> AppResult<()> {
        self.joined(actor, conversation_id).await?;
        self.uow
            .chat()
            .mark_read(conversation_id, actor.user_id, Utc::now())
            .await
    }
}
