//! Communication link between two units.

use sea_orm::entity::prelude::*;

use crate::domain::CommunicationLink;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "communication_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_unit_id: Uuid,
    pub target_unit_id: Uuid,
    pub bidirectional: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CommunicationLink {
    fn from(model: Model) -> Self {
        CommunicationLink {
            id: model.id,
            tenant_id: model.tenant_id,
            source_unit_id: model.source_unit_id,
            target_unit_id: model.target_unit_id,
            bidirectional: model.bidirectional,
            created_at: model.created_at,
        }
    }
}
