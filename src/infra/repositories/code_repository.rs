//! Code document repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::code_document::{self, ActiveModel, Entity as DocumentEntity};
use crate::domain::CodeDocument;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CodeRepository: Send + Sync {
    async fn create(&self, document: CodeDocument) -> AppResult<CodeDocument>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CodeDocument>>;

    /// Documents of the tenant, optionally only those owned by `owner_id`
    async fn list(&self, tenant_id: Uuid, owner_id: Option<Uuid>) -> AppResult<Vec<CodeDocument>>;

    async fn update(&self, document: CodeDocument) -> AppResult<CodeDocument>;

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;
}

pub struct CodeStore {
    db: DatabaseConnection,
}

impl CodeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(document: CodeDocument) -> ActiveModel {
    ActiveModel {
        id: Set(document.id),
        tenant_id: Set(document.tenant_id),
        owner_id: Set(document.owner_id),
        name: Set(document.name),
        language: Set(document.language.as_str().to_string()),
        content: Set(document.content),
        created_at: Set(document.created_at),
        updated_at: Set(document.updated_at),
    }
}

#[async_trait]
impl CodeRepository for CodeStore {
    async fn create(&self, document: CodeDocument) -> AppResult<CodeDocument> {
        let model = to_active(document)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        CodeDocument::try_from(model)
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CodeDocument>> {
        DocumentEntity::find_by_id(id)
            .filter(code_document::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(CodeDocument::try_from)
            .transpose()
    }

    async fn list(&self, tenant_id: Uuid, owner_id: Option<Uuid>) -> AppResult<Vec<CodeDocument>> {
        let mut query =
            DocumentEntity::find().filter(code_document::Column::TenantId.eq(tenant_id));
        if let Some(owner_id) = owner_id {
            query = query.filter(code_document::Column::OwnerId.eq(owner_id));
        }

        query
            .order_by_asc(code_document::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(CodeDocument::try_from)
            .collect()
    }

    async fn update(&self, document: CodeDocument) -> AppResult<CodeDocument> {
        let model = to_active(document)
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        CodeDocument::try_from(model)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = DocumentEntity::delete_many()
            .filter(code_document::Column::Id.eq(id))
            .filter(code_document::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
