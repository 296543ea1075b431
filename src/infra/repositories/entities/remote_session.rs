//! Remote desktop session entity.

use sea_orm::entity::prelude::*;

use crate::domain::RemoteSession;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "remote_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub host_id: Uuid,
    pub controller_id: Uuid,
    pub status: String,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub created_at: DateTimeUtc,
    pub started_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RemoteSession {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(RemoteSession {
            id: model.id,
            tenant_id: model.tenant_id,
            host_id: model.host_id,
            controller_id: model.controller_id,
            status: model.status.parse()?,
            screen_width: model.screen_width,
            screen_height: model.screen_height,
            created_at: model.created_at,
            started_at: model.started_at,
            ended_at: model.ended_at,
        })
    }
}
