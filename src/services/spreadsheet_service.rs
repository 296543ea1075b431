//! Spreadsheet service.
//!
//! Owners have full control of their sheets; holders of `spreadsheet.edit`
//! may read and edit every sheet in the tenant. Every write that stores the
//! sheet row runs under a distributed lock so concurrent writes never
//! overwrite each other.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use crate::domain::spreadsheet::validate_dimensions;
use crate::domain::{Actor, CellUpdate, Cells, Permission, Spreadsheet};
use crate::errors::{AppError, AppResult};
use crate::infra::{LockManager, UnitOfWork};

#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    async fn create_sheet(&self, actor: &Actor, name: String, rows: i32, cols: i32)
        -> AppResult<Spreadsheet>;
    async fn get_sheet(&self, actor: &Actor, id: Uuid) -> AppResult<Spreadsheet>;
    /// The caller's sheets, or every tenant sheet for editors
    async fn list_sheets(&self, actor: &Actor) -> AppResult<Vec<Spreadsheet>>;
    async fn rename_sheet(&self, actor: &Actor, id: Uuid, name: String) -> AppResult<Spreadsheet>;
    /// Resize the grid; cells outside the new bounds are dropped
    async fn resize_sheet(&self, actor: &Actor, id: Uuid, rows: i32, cols: i32)
        -> AppResult<Spreadsheet>;
    /// Apply a batch of cell writes atomically
    async fn set_cells(
        &self,
        actor: &Actor,
        id: Uuid,
        updates: Vec<CellUpdate>,
    ) -> AppResult<Spreadsheet>;
    async fn delete_sheet(&self, actor: &Actor, id: Uuid) -> AppResult<()>;
    /// Sheet name and CSV body
    async fn export_csv(&self, actor: &Actor, id: Uuid) -> AppResult<(String, String)>;
}

pub struct SpreadsheetManager<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn LockManager>,
}

fn lock_resource(id: Uuid) -> String {
    format!("spreadsheet:{}", id)
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Sheet name cannot be empty"));
    }
    Ok(name.to_string())
}

impl<U: UnitOfWork> SpreadsheetManager<U> {
    pub fn new(uow: Arc<U>, locks: Arc<dyn LockManager>) -> Self {
        Self { uow, locks }
    }

    async fn is_editor(&self, actor: &Actor) -> AppResult<bool> {
        access::has_permission(self.uow.as_ref(), actor, Permission::SpreadsheetEdit).await
    }

    /// Load a sheet the actor may open: its own, or any for editors.
    async fn accessible(&self, actor: &Actor, id: Uuid) -> AppResult<Spreadsheet> {
        let sheet = self
            .uow
            .spreadsheets()
            .find(actor.tenant_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if sheet.owner_id == actor.user_id || self.is_editor(actor).await? {
            Ok(sheet)
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Reload, mutate and store a sheet while holding its lock.
    async fn locked_update<F>(&self, actor: &Actor, id: Uuid, mutate: F) -> AppResult<Spreadsheet>
    where
        F: FnOnce(&mut Spreadsheet) -> AppResult<()> + Send,
    {
        let token = self.locks.acquire(&lock_resource(id)).await?;

        let result = async {
            let mut sheet = self.accessible(actor, id).await?;
            mutate(&mut sheet)?;
            sheet.updated_at = Utc::now();
            self.uow.spreadsheets().update(sheet).await
        }
        .await;

        if let Err(e) = self.locks.release(token).await {
            tracing::warn!(sheet_id = %id, error = %e, "Failed to release sheet lock");
        }
        result
    }
}

#[async_trait]
impl<U: UnitOfWork> SpreadsheetService for SpreadsheetManager<U> {
    async fn create_sheet(
        &self,
        actor: &Actor,
        name: String,
        rows: i32,
        cols: i32,
    ) -> AppResult<Spreadsheet> {
        let name = clean_name(&name)?;
        validate_dimensions(rows, cols)?;

        let now = Utc::now();
        let sheet = self
            .uow
            .spreadsheets()
            .create(Spreadsheet {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                owner_id: actor.user_id,
                name,
                rows,
                cols,
                cells: Cells::new(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::debug!(sheet_id = %sheet.id, rows, cols, "Spreadsheet created");
        Ok(sheet)
    }

    async fn get_sheet(&self, actor: &Actor, id: Uuid) -> AppResult<Spreadsheet> {
        self.accessible(actor, id).await
    }

    async fn list_sheets(&self, actor: &Actor) -> AppResult<Vec<Spreadsheet>> {
        let owner = if self.is_editor(actor).await? {
            None
        } else {
            Some(actor.user_id)
        };
        self.uow.spreadsheets().list(actor.tenant_id, owner).await
    }

    async fn rename_sheet(&self, actor: &Actor, id: Uuid, name: String) -> AppResult<Spreadsheet> {
        let name = clean_name(&name)?;
        // the row is written whole, cells included
        self.locked_update(actor, id, move |sheet| {
            sheet.name = name;
            Ok(())
        })
        .await
    }

    async fn resize_sheet(
        &self,
        actor: &Actor,
        id: Uuid,
        rows: i32,
        cols: i32,
    ) -> AppResult<Spreadsheet> {
        validate_dimensions(rows, cols)?;
        self.locked_update(actor, id, move |sheet| sheet.resize(rows, cols))
            .await
    }

    async fn set_cells(
        &self,
        actor: &Actor,
        id: Uuid,
        updates: Vec<CellUpdate>,
    ) -> AppResult<Spreadsheet> {
        if updates.is_empty() {
            return self.accessible(actor, id).await;
        }

        let count = updates.len();
        let sheet = self
            .locked_update(actor, id, move |sheet| sheet.set_cells(&updates))
            .await?;
        tracing::debug!(sheet_id = %id, cells = count, "Cells written");
        Ok(sheet)
    }

    async fn delete_sheet(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let sheet = self.accessible(actor, id).await?;
        // editors may change content but only the owner or an admin deletes
        if sheet.owner_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.uow.spreadsheets().delete(actor.tenant_id, id).await
    }

    async fn export_csv(&self, actor: &Actor, id: Uuid) -> AppResult<(String, String)> {
        let sheet = self.accessible(actor, id).await?;
        let csv = sheet.to_csv();
        Ok((sheet.name, csv))
    }
}
