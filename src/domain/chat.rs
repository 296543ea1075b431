//! Conversations and chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_MESSAGE_LENGTH;
use crate::errors::{AppError, AppResult};

/// Conversation between two or more users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: Option<String>,
    pub is_group: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Bumped on every message; drives list ordering
    pub updated_at: DateTime<Utc>,
}

/// Participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Conversation plus its participant ids
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationDetails {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participant_ids: Vec<Uuid>,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Hide the body of deleted messages before they leave the service.
    pub fn redacted(mut self) -> Self {
        if self.deleted_at.is_some() {
            self.body.clear();
        }
        self
    }
}

/// Trim and bound-check a message body.
pub fn normalize_body(body: &str) -> AppResult<String> {
    let trimmed = body.trim();
    let length = trimmed.chars().count();
    if length == 0 || length > MAX_MESSAGE_LENGTH as usize {
        return Err(AppError::validation(format!(
            "Message must be between 1 and {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Deduplicated participant list with the creator included, sorted.
pub fn participant_set(creator: Uuid, others: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let mut ids: Vec<Uuid> = others.iter().copied().chain([creator]).collect();
    ids.sort();
    ids.dedup();
    if ids.len() < 2 {
        return Err(AppError::validation(
            "A conversation needs at least one other participant",
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_trimmed_and_bounded() {
        assert_eq!(normalize_body("  hi  ").unwrap(), "hi");
        assert!(normalize_body("   ").is_err());
        assert!(normalize_body(&"x".repeat(MAX_MESSAGE_LENGTH as usize + 1)).is_err());
    }

    #[test]
    fn test_participant_set_includes_creator_once() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let set = participant_set(me, &[other, me, other]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&me) && set.contains(&other));
        assert!(participant_set(me, &[me]).is_err());
    }

    #[test]
    fn test_redacted_clears_deleted_body() {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            body: "secret".into(),
            created_at: Utc::now(),
            edited_at: None,
            deleted_at: Some(Utc::now()),
        };
        assert!(message.redacted().body.is_empty());
    }
}
