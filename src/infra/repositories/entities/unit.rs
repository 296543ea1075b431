//! Org unit entity.

use sea_orm::entity::prelude::*;

use crate::domain::Unit;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Unit {
    fn from(model: Model) -> Self {
        Unit {
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            parent_id: model.parent_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
