//! Spreadsheet entity. Cells live in a JSON object column.

use sea_orm::entity::prelude::*;

use crate::domain::{Cells, Spreadsheet};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "spreadsheets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub rows: i32,
    pub cols: i32,
    pub cells: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Spreadsheet {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let cells: Cells = serde_json::from_value(model.cells)
            .map_err(|e| AppError::internal(format!("Corrupt cells for sheet {}: {}", model.id, e)))?;
        Ok(Spreadsheet {
            id: model.id,
            tenant_id: model.tenant_id,
            owner_id: model.owner_id,
            name: model.name,
            rows: model.rows,
            cols: model.cols,
            cells,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
