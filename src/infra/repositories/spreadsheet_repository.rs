//! Spreadsheet repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::spreadsheet::{self, ActiveModel, Entity as SheetEntity};
use crate::domain::Spreadsheet;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SpreadsheetRepository: Send + Sync {
    async fn create(&self, sheet: Spreadsheet) -> AppResult<Spreadsheet>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Spreadsheet>>;

    /// Sheets of the tenant, optionally only those owned by `owner_id`
    async fn list(&self, tenant_id: Uuid, owner_id: Option<Uuid>) -> AppResult<Vec<Spreadsheet>>;

    async fn update(&self, sheet: Spreadsheet) -> AppResult<Spreadsheet>;

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;
}

pub struct SpreadsheetStore {
    db: DatabaseConnection,
}

impl SpreadsheetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(sheet: Spreadsheet) -> AppResult<ActiveModel> {
    let cells = serde_json::to_value(&sheet.cells)
        .map_err(|e| AppError::internal(format!("Failed to encode cells: {}", e)))?;
    Ok(ActiveModel {
        id: Set(sheet.id),
        tenant_id: Set(sheet.tenant_id),
        owner_id: Set(sheet.owner_id),
        name: Set(sheet.name),
        rows: Set(sheet.rows),
        cols: Set(sheet.cols),
        cells: Set(cells),
        created_at: Set(sheet.created_at),
        updated_at: Set(sheet.updated_at),
    })
}

#[async_trait]
impl SpreadsheetRepository for SpreadsheetStore {
    async fn create(&self, sheet: Spreadsheet) -> AppResult<Spreadsheet> {
        let model = to_active(sheet)?
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        Spreadsheet::try_from(model)
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Spreadsheet>> {
        SheetEntity::find_by_id(id)
            .filter(spreadsheet::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(Spreadsheet::try_from)
            .transpose()
    }

    async fn list(&self, tenant_id: Uuid, owner_id: Option<Uuid>) -> AppResult<Vec<Spreadsheet>> {
        let mut query = SheetEntity::find().filter(spreadsheet::Column::TenantId.eq(tenant_id));
        if let Some(owner_id) = owner_id {
            query = query.filter(spreadsheet::Column::OwnerId.eq(owner_id));
        }

        query
            .order_by_desc(spreadsheet::Column::UpdatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(Spreadsheet::try_from)
            .collect()
    }

    async fn update(&self, sheet: Spreadsheet) -> AppResult<Spreadsheet> {
        let model = to_active(sheet)?
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        Spreadsheet::try_from(model)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = SheetEntity::delete_many()
            .filter(spreadsheet::Column::Id.eq(id))
            .filter(spreadsheet::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
