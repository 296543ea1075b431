//! Calendar event entity.

use sea_orm::entity::prelude::*;

use crate::domain::CalendarEvent;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "calendar_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub all_day: bool,
    pub remind_before_minutes: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CalendarEvent {
    fn from(model: Model) -> Self {
        CalendarEvent {
            id: model.id,
            tenant_id: model.tenant_id,
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            location: model.location,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            all_day: model.all_day,
            remind_before_minutes: model.remind_before_minutes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
