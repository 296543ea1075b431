//! Phone call entity.

use sea_orm::entity::prelude::*;

use crate::domain::PhoneCall;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "phone_calls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub status: String,
    pub started_at: DateTimeUtc,
    pub answered_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PhoneCall {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(PhoneCall {
            id: model.id,
            tenant_id: model.tenant_id,
            caller_id: model.caller_id,
            callee_id: model.callee_id,
            status: model.status.parse()?,
            started_at: model.started_at,
            answered_at: model.answered_at,
            ended_at: model.ended_at,
        })
    }
}
