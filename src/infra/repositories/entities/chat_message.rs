//! Chat message entity.

use sea_orm::entity::prelude::*;

use crate::domain::ChatMessage;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chat_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTimeUtc,
    pub edited_at: Option<DateTimeUtc>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ChatMessage {
    fn from(model: Model) -> Self {
        ChatMessage {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            body: model.body,
            created_at: model.created_at,
            edited_at: model.edited_at,
            deleted_at: model.deleted_at,
        }
    }
}
