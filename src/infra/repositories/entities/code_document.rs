//! Code editor document entity.

use sea_orm::entity::prelude::*;

use crate::domain::CodeDocument;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "code_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub language: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CodeDocument {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(CodeDocument {
            id: model.id,
            tenant_id: model.tenant_id,
            owner_id: model.owner_id,
            name: model.name,
            language: model.language.parse()?,
            content: model.content,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
