//! Notifications and push events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Event kinds pushed to clients
pub mod kinds {
    pub const CHAT_MESSAGE: &str = "chat.message";
    pub const CALENDAR_REMINDER: &str = "calendar.reminder";
    pub const PHONE_INCOMING: &str = "phone.incoming";
    pub const PHONE_UPDATED: &str = "phone.updated";
    pub const REMOTE_REQUEST: &str = "remote.request";
    pub const REMOTE_UPDATED: &str = "remote.updated";
    pub const REMOTE_INPUT: &str = "remote.input";
    pub const REMOTE_FRAME: &str = "remote.frame";
}

/// Stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "chat.message")]
    pub kind: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(tenant_id: Uuid, user_id: Uuid, kind: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            kind: kind.to_string(),
            payload,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Message sent over the WebSocket push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub kind: String,
    /// Id of the stored notification; absent for transient relays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl PushEvent {
    /// Transient event that is never persisted (remote input and frames).
    pub fn transient(kind: &str, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            notification_id: None,
            payload,
            at: Utc::now(),
        }
    }
}

impl From<&Notification> for PushEvent {
    fn from(n: &Notification) -> Self {
        Self {
            kind: n.kind.clone(),
            notification_id: Some(n.id),
            payload: n.payload.clone(),
            at: n.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_event_from_notification() {
        let n = Notification::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            kinds::CHAT_MESSAGE,
            json!({"body": "hi"}),
        );
        let event = PushEvent::from(&n);
        assert_eq!(event.notification_id, Some(n.id));
        assert_eq!(event.kind, "chat.message");
    }

    #[test]
    fn test_transient_omits_id() {
        let event = PushEvent::transient(kinds::REMOTE_FRAME, json!({}));
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("notification_id"));
    }
}
